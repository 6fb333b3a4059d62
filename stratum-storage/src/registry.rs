//! Priority-ordered provider registry.
//!
//! The registry fixes the tier order once, at construction, from an injected
//! [`PriorityTable`]. Every request sees the same order. Lookups by tier are
//! linear scans over the registered providers; the number of tiers is small
//! and fixed, so no index is kept.

use std::fmt;

use stratum_core::{ConfigError, PriorityTable, TierId};

use crate::provider::SharedProvider;

/// Providers sorted fastest (lowest rank) first.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<SharedProvider>,
    ranks: Vec<u32>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers: Vec<String> = self
            .providers
            .iter()
            .zip(&self.ranks)
            .map(|(p, rank)| format!("{}={}", p.tier(), rank))
            .collect();
        f.debug_struct("ProviderRegistry")
            .field("tiers", &tiers)
            .finish()
    }
}

impl ProviderRegistry {
    /// Build the registry.
    ///
    /// # Errors
    ///
    /// Fails when no providers are given, when two providers report the same
    /// tier, when a provider's tier has no rank in `table`, or when two
    /// providers would share a rank.
    pub fn new(table: &PriorityTable, providers: Vec<SharedProvider>) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        table.validate()?;

        let mut ranked = Vec::with_capacity(providers.len());
        for provider in providers {
            let tier = provider.tier().clone();
            if ranked
                .iter()
                .any(|(_, p): &(u32, SharedProvider)| p.tier() == &tier)
            {
                return Err(ConfigError::DuplicateTier { tier });
            }
            let rank = table
                .rank_of(&tier)
                .ok_or_else(|| ConfigError::UnrankedTier { tier: tier.clone() })?;
            ranked.push((rank, provider));
        }

        ranked.sort_by_key(|(rank, _)| *rank);

        let (ranks, providers): (Vec<u32>, Vec<SharedProvider>) = ranked.into_iter().unzip();
        Ok(Self { providers, ranks })
    }

    /// Every provider, fastest first.
    pub fn all_in_order(&self) -> &[SharedProvider] {
        &self.providers
    }

    /// Providers ranked strictly ahead of `tier`.
    ///
    /// Empty when `tier` is the fastest tier.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnregisteredProvider`] when `tier` is not registered.
    pub fn providers_before(&self, tier: &TierId) -> Result<&[SharedProvider], ConfigError> {
        let position = self.position(tier)?;
        Ok(&self.providers[..position])
    }

    /// Index of `tier` in the fixed order.
    pub fn position(&self, tier: &TierId) -> Result<usize, ConfigError> {
        self.providers
            .iter()
            .position(|p| p.tier() == tier)
            .ok_or_else(|| ConfigError::UnregisteredProvider { tier: tier.clone() })
    }

    /// The provider serving `tier`.
    pub fn provider(&self, tier: &TierId) -> Result<&SharedProvider, ConfigError> {
        let position = self.position(tier)?;
        Ok(&self.providers[position])
    }

    /// Tier identities in order.
    pub fn tiers(&self) -> Vec<TierId> {
        self.providers.iter().map(|p| p.tier().clone()).collect()
    }

    /// Rank of the provider at `position`.
    pub fn rank_at(&self, position: usize) -> Option<u32> {
        self.ranks.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use std::sync::Arc;
    use stratum_core::TierPriority;

    fn provider(tier: TierId) -> SharedProvider {
        Arc::new(MockProvider::new(tier))
    }

    fn standard_registry() -> Result<ProviderRegistry, ConfigError> {
        // Deliberately registered out of order.
        ProviderRegistry::new(
            &PriorityTable::standard(),
            vec![
                provider(TierId::DATABASE),
                provider(TierId::CACHE),
                provider(TierId::FILE),
            ],
        )
    }

    #[test]
    fn test_all_in_order_sorts_by_rank() -> Result<(), ConfigError> {
        let registry = standard_registry()?;
        assert_eq!(
            registry.tiers(),
            vec![TierId::CACHE, TierId::FILE, TierId::DATABASE]
        );
        assert_eq!(registry.rank_at(0), Some(0));
        assert_eq!(registry.rank_at(3), None);
        Ok(())
    }

    #[test]
    fn test_providers_before() -> Result<(), ConfigError> {
        let registry = standard_registry()?;

        assert!(registry.providers_before(&TierId::CACHE)?.is_empty());

        let before_file: Vec<TierId> = registry
            .providers_before(&TierId::FILE)?
            .iter()
            .map(|p| p.tier().clone())
            .collect();
        assert_eq!(before_file, vec![TierId::CACHE]);

        let before_db: Vec<TierId> = registry
            .providers_before(&TierId::DATABASE)?
            .iter()
            .map(|p| p.tier().clone())
            .collect();
        assert_eq!(before_db, vec![TierId::CACHE, TierId::FILE]);
        Ok(())
    }

    #[test]
    fn test_providers_before_unregistered_tier() -> Result<(), ConfigError> {
        let registry = standard_registry()?;
        let result = registry.providers_before(&TierId::new("remote"));
        assert!(matches!(
            result,
            Err(ConfigError::UnregisteredProvider { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_empty_registry_rejected() {
        let result = ProviderRegistry::new(&PriorityTable::standard(), vec![]);
        assert!(matches!(result, Err(ConfigError::NoProviders)));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let result = ProviderRegistry::new(
            &PriorityTable::standard(),
            vec![provider(TierId::CACHE), provider(TierId::CACHE)],
        );
        assert!(matches!(result, Err(ConfigError::DuplicateTier { .. })));
    }

    #[test]
    fn test_unranked_provider_rejected() {
        let result = ProviderRegistry::new(
            &PriorityTable::standard(),
            vec![provider(TierId::CACHE), provider(TierId::new("remote"))],
        );
        assert!(matches!(result, Err(ConfigError::UnrankedTier { .. })));
    }

    #[test]
    fn test_custom_order_from_table() -> Result<(), ConfigError> {
        let table = PriorityTable::new(vec![
            TierPriority::new(TierId::DATABASE, 0),
            TierPriority::new(TierId::CACHE, 7),
        ])?;
        let registry = ProviderRegistry::new(
            &table,
            vec![provider(TierId::CACHE), provider(TierId::DATABASE)],
        )?;
        assert_eq!(registry.tiers(), vec![TierId::DATABASE, TierId::CACHE]);
        assert_eq!(registry.position(&TierId::CACHE)?, 1);
        assert_eq!(registry.provider(&TierId::DATABASE)?.tier(), &TierId::DATABASE);
        Ok(())
    }
}
