//! Tiered storage orchestrator.
//!
//! Routes every logical operation through the [`ProviderRegistry`] order,
//! one tier at a time:
//!
//! - **read**: first hit wins; faster tiers that missed are refreshed with the
//!   hit (best-effort)
//! - **save**: written to every tier fastest first; a failure deletes the copies
//!   already written, then fails the whole save
//! - **update**: rewritten in every tier; the first failure stops the update and
//!   nothing is rolled back
//! - **delete**: attempted in every tier regardless of individual failures
//!
//! No locks are taken across tiers. Concurrent operations on the same id may
//! interleave; tiers can disagree transiently.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use stratum_core::{
    validate_value, ConfigError, OrchestratorConfig, ProviderError, Record, RecordId,
    StorageError, StratumResult, TierId,
};

use crate::observe::{CallKind, CallObserver};
use crate::provider::{ProviderResult, SharedProvider};
use crate::registry::ProviderRegistry;

/// Where a record was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoundIn {
    /// Read from this tier; only faster tiers need the record.
    Tier(TierId),
    /// Freshly built or rewritten; every tier needs the record.
    Unknown,
}

/// A record together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub record: Record,
    pub found_in: FoundIn,
}

impl SearchResult {
    fn pending(record: Record) -> Self {
        Self {
            record,
            found_in: FoundIn::Unknown,
        }
    }
}

/// Result of one tier's part in a multi-tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Succeeded,
    Failed(ProviderError),
}

impl TierOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TierOutcome::Succeeded)
    }
}

/// Per-tier results of a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub id: RecordId,
    pub outcomes: Vec<(TierId, TierOutcome)>,
}

impl DeleteReport {
    /// True when every tier reported success.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_success())
    }

    /// Tiers whose delete failed, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&TierId, &ProviderError)> {
        self.outcomes.iter().filter_map(|(tier, outcome)| match outcome {
            TierOutcome::Failed(err) => Some((tier, err)),
            TierOutcome::Succeeded => None,
        })
    }
}

/// Front door to the tier stack.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    config: OrchestratorConfig,
    observer: Option<Arc<dyn CallObserver>>,
}

impl Orchestrator {
    pub fn new(registry: ProviderRegistry, config: OrchestratorConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            observer: None,
        }
    }

    /// Report every provider call, refresh and rollback calls included, to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Orchestrator with refresh-on-read enabled and the default call timeout.
    pub fn with_defaults(registry: ProviderRegistry) -> Self {
        Self::new(registry, OrchestratorConfig::default())
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// Fetch a record from the fastest tier holding it.
    ///
    /// Returns `Ok(None)` when no tier has it. Tiers that fail are logged and
    /// skipped as misses.
    #[tracing::instrument(skip_all, fields(id = %id.as_ref()))]
    pub async fn get_by_id(&self, id: impl AsRef<str>) -> StratumResult<Option<Record>> {
        let id = RecordId::parse(id.as_ref())?;
        Ok(self.search(&id).await.map(|hit| hit.record))
    }

    /// Locate `id`, refreshing faster tiers on a hit below the first tier.
    pub async fn search(&self, id: &RecordId) -> Option<SearchResult> {
        for provider in self.registry.all_in_order() {
            let tier = provider.tier();
            match self.call(tier, CallKind::Get, provider.get(id)).await {
                Ok(Some(record)) => {
                    tracing::debug!(tier = %tier, id = %id, "record found");
                    let hit = SearchResult {
                        record,
                        found_in: FoundIn::Tier(tier.clone()),
                    };
                    if self.config.refresh_on_read {
                        self.refresh(&hit).await;
                    }
                    return Some(hit);
                }
                Ok(None) => {
                    tracing::debug!(tier = %tier, id = %id, "record not in tier");
                }
                Err(err) => {
                    tracing::warn!(tier = %tier, id = %id, error = %err, "tier read failed, treating as miss");
                }
            }
        }

        tracing::debug!(id = %id, "record not found in any tier");
        None
    }

    /// Copy a hit into every tier that should already have held it.
    ///
    /// Failures are logged and otherwise ignored: the caller already has the
    /// record.
    async fn refresh(&self, hit: &SearchResult) {
        let targets = match self.propagation_targets(&hit.found_in) {
            Ok(targets) => targets,
            Err(err) => {
                tracing::warn!(id = %hit.record.id, error = %err, "refresh skipped");
                return;
            }
        };

        for provider in targets {
            let tier = provider.tier();
            match self.call(tier, CallKind::Refresh, provider.save(&hit.record)).await {
                Ok(()) => tracing::debug!(tier = %tier, id = %hit.record.id, "tier refreshed"),
                Err(err) => {
                    tracing::warn!(tier = %tier, id = %hit.record.id, error = %err, "refresh failed");
                }
            }
        }
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Store a new record in every tier and return its freshly minted id.
    ///
    /// If any tier fails, copies already written to faster tiers are deleted
    /// and the save fails. The record then exists in no tier, unless a
    /// compensating delete itself failed (logged).
    #[tracing::instrument(skip_all, fields(value_len = value.len()))]
    pub async fn save(&self, value: &str) -> StratumResult<RecordId> {
        validate_value(value)?;

        let pending = SearchResult::pending(Record::new(value));
        let record = &pending.record;
        let targets = self.propagation_targets(&pending.found_in)?;

        let mut written: Vec<&SharedProvider> = Vec::with_capacity(targets.len());
        for provider in targets {
            let tier = provider.tier();
            match self.call(tier, CallKind::Save, provider.save(record)).await {
                Ok(()) => written.push(provider),
                Err(err) => {
                    tracing::error!(tier = %tier, id = %record.id, error = %err, "save failed, rolling back");
                    self.rollback(&record.id, &written).await;
                    return Err(StorageError::SaveFailed {
                        tier: tier.clone(),
                        source: err,
                    }
                    .into());
                }
            }
        }

        tracing::info!(id = %record.id, tiers = written.len(), "record saved");
        Ok(pending.record.id)
    }

    /// Delete `id` from every tier in `written`, slowest first.
    async fn rollback(&self, id: &RecordId, written: &[&SharedProvider]) {
        let mut failed = 0;
        for provider in written.iter().rev() {
            let tier = provider.tier();
            match self.call(tier, CallKind::Rollback, provider.delete(id)).await {
                Ok(()) => tracing::debug!(tier = %tier, id = %id, "rolled back"),
                Err(err) => {
                    failed += 1;
                    tracing::warn!(tier = %tier, id = %id, error = %err, "rollback delete failed");
                }
            }
        }
        if failed > 0 {
            tracing::warn!(id = %id, failed, "rollback incomplete");
        }
    }

    // ========================================================================
    // UPDATE PATH
    // ========================================================================

    /// Replace the value of an existing record in every tier.
    ///
    /// Fails with [`StorageError::NotFound`] without touching any tier when no
    /// tier holds `id`. A tier error stops the update; tiers already updated
    /// keep the new value. A tier that simply holds no copy is re-seeded.
    #[tracing::instrument(skip_all, fields(id = %id.as_ref()))]
    pub async fn update(&self, id: impl AsRef<str>, value: &str) -> StratumResult<RecordId> {
        let id = RecordId::parse(id.as_ref())?;
        validate_value(value)?;

        let Some(found) = self.search(&id).await else {
            return Err(StorageError::NotFound { id }.into());
        };

        let mut record = found.record;
        record.overwrite(value);
        let pending = SearchResult::pending(record);
        let record = &pending.record;

        for provider in self.propagation_targets(&pending.found_in)? {
            let tier = provider.tier();
            let outcome = match self.call(tier, CallKind::Update, provider.update(record)).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    tracing::debug!(tier = %tier, id = %id, "tier held no copy, re-seeding");
                    self.call(tier, CallKind::Reseed, provider.save(record)).await
                }
                Err(err) => Err(err),
            };

            if let Err(err) = outcome {
                tracing::error!(tier = %tier, id = %id, error = %err, "update failed");
                return Err(StorageError::UpdateFailed {
                    id,
                    tier: tier.clone(),
                    source: err,
                }
                .into());
            }
        }

        tracing::info!(id = %id, "record updated");
        Ok(id)
    }

    // ========================================================================
    // DELETE PATH
    // ========================================================================

    /// Delete `id` from every tier, continuing past individual failures.
    #[tracing::instrument(skip_all, fields(id = %id.as_ref()))]
    pub async fn delete(&self, id: impl AsRef<str>) -> StratumResult<DeleteReport> {
        let id = RecordId::parse(id.as_ref())?;

        let mut outcomes = Vec::with_capacity(self.registry.len());
        for provider in self.registry.all_in_order() {
            let tier = provider.tier();
            let outcome = match self.call(tier, CallKind::Delete, provider.delete(&id)).await {
                Ok(()) => TierOutcome::Succeeded,
                Err(err) => {
                    tracing::warn!(tier = %tier, id = %id, error = %err, "tier delete failed");
                    TierOutcome::Failed(err)
                }
            };
            outcomes.push((tier.clone(), outcome));
        }

        let report = DeleteReport { id, outcomes };
        if report.is_complete() {
            tracing::info!(id = %report.id, "record deleted");
        }
        Ok(report)
    }

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Probe every tier in order.
    pub async fn tier_health(&self) -> Vec<(TierId, TierOutcome)> {
        let mut results = Vec::with_capacity(self.registry.len());
        for provider in self.registry.all_in_order() {
            let tier = provider.tier();
            let outcome = match self.call(tier, CallKind::HealthCheck, provider.health_check()).await {
                Ok(()) => TierOutcome::Succeeded,
                Err(err) => TierOutcome::Failed(err),
            };
            results.push((tier.clone(), outcome));
        }
        results
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Tiers that must receive `found_in`'s record.
    fn propagation_targets(&self, found_in: &FoundIn) -> Result<&[SharedProvider], ConfigError> {
        match found_in {
            FoundIn::Tier(tier) => self.registry.providers_before(tier),
            FoundIn::Unknown => Ok(self.registry.all_in_order()),
        }
    }

    /// Await one provider call under the configured deadline and report it.
    async fn call<T, F>(&self, tier: &TierId, kind: CallKind, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        let started = Instant::now();
        let result = match self.config.call_timeout() {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    tier: tier.clone(),
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => fut.await,
        };

        if let Some(observer) = &self.observer {
            observer.on_call(tier, kind, result.as_ref().err(), started.elapsed());
        }
        result
    }
}
