//! Tier identities and the priority table that orders them.
//!
//! Tier order is data, not code: a [`PriorityTable`] is an ordered list of
//! `(tier, rank)` pairs built once at startup and injected into the registry.
//! Lower ranks are faster and are consulted first.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Stable identity reported by a storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(Cow<'static, str>);

impl TierId {
    /// Name of the volatile in-memory tier in the shipped configuration.
    pub const CACHE: TierId = TierId(Cow::Borrowed("cache"));
    /// Name of the on-disk file tier in the shipped configuration.
    pub const FILE: TierId = TierId(Cow::Borrowed("file"));
    /// Name of the authoritative database tier in the shipped configuration.
    pub const DATABASE: TierId = TierId(Cow::Borrowed("database"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TierId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Rank assigned to one tier. Lower is consulted earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPriority {
    pub tier: TierId,
    pub rank: u32,
}

impl TierPriority {
    pub fn new(tier: impl Into<TierId>, rank: u32) -> Self {
        Self {
            tier: tier.into(),
            rank,
        }
    }
}

/// Ordered `(tier, rank)` table.
///
/// A valid table names every tier at most once and never gives two tiers the
/// same rank, so it always describes a total order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityTable {
    entries: Vec<TierPriority>,
}

impl PriorityTable {
    /// Build a table, validating that it describes a total order.
    pub fn new(entries: Vec<TierPriority>) -> Result<Self, ConfigError> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    /// The shipped three-tier ordering: cache, then file, then database.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                TierPriority::new(TierId::CACHE, 0),
                TierPriority::new(TierId::FILE, 1),
                TierPriority::new(TierId::DATABASE, 2),
            ],
        }
    }

    /// Check for an empty table, repeated tiers and repeated ranks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "tier_priority".to_string(),
            });
        }

        for (i, entry) in self.entries.iter().enumerate() {
            for other in &self.entries[i + 1..] {
                if entry.tier == other.tier {
                    return Err(ConfigError::DuplicateTier {
                        tier: entry.tier.clone(),
                    });
                }
                if entry.rank == other.rank {
                    return Err(ConfigError::DuplicateRank {
                        rank: entry.rank,
                        first: entry.tier.clone(),
                        second: other.tier.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Rank of a tier, or `None` when the table does not mention it.
    pub fn rank_of(&self, tier: &TierId) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| &entry.tier == tier)
            .map(|entry| entry.rank)
    }

    /// Entries sorted fastest first.
    pub fn ordered(&self) -> Vec<TierPriority> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|entry| entry.rank);
        sorted
    }

    pub fn entries(&self) -> &[TierPriority] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parses `cache=0,file=1,database=2`.
impl FromStr for PriorityTable {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (tier, rank) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                field: "tier_priority".to_string(),
                value: pair.to_string(),
                reason: "expected <tier>=<rank>".to_string(),
            })?;
            let tier = tier.trim();
            if tier.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "tier_priority".to_string(),
                    value: pair.to_string(),
                    reason: "tier name is empty".to_string(),
                });
            }
            let rank = rank.trim().parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                field: "tier_priority".to_string(),
                value: pair.to_string(),
                reason: e.to_string(),
            })?;
            entries.push(TierPriority::new(tier, rank));
        }
        Self::new(entries)
    }
}
