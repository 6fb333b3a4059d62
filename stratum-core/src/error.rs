//! Error types for Stratum operations

use crate::{RecordId, TierId};
use thiserror::Error;

/// Failures raised by a single storage tier.
///
/// Absence of a record is never a `ProviderError`; providers report it as
/// `Ok(None)` or `Ok(false)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("I/O error in tier {tier}: {reason}")]
    Io { tier: TierId, reason: String },

    #[error("Serialization error in tier {tier}: {reason}")]
    Serialization { tier: TierId, reason: String },

    #[error("Tier {tier} cannot store key {id}: {reason}")]
    InvalidKey {
        tier: TierId,
        id: RecordId,
        reason: String,
    },

    #[error("Backend error in tier {tier}: {reason}")]
    Backend { tier: TierId, reason: String },

    #[error("Tier {tier} unavailable: {reason}")]
    Unavailable { tier: TierId, reason: String },

    #[error("Tier {tier} did not answer within {after_ms}ms")]
    Timeout { tier: TierId, after_ms: u64 },
}

impl ProviderError {
    /// The tier that raised this error.
    pub fn tier(&self) -> &TierId {
        match self {
            ProviderError::Io { tier, .. }
            | ProviderError::Serialization { tier, .. }
            | ProviderError::InvalidKey { tier, .. }
            | ProviderError::Backend { tier, .. }
            | ProviderError::Unavailable { tier, .. }
            | ProviderError::Timeout { tier, .. } => tier,
        }
    }
}

/// Operation-level outcomes of the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {id}")]
    NotFound { id: RecordId },

    #[error("Save failed at tier {tier}: {source}")]
    SaveFailed {
        tier: TierId,
        #[source]
        source: ProviderError,
    },

    #[error("Update of {id} failed at tier {tier}: {source}")]
    UpdateFailed {
        id: RecordId,
        tier: TierId,
        #[source]
        source: ProviderError,
    },
}

impl StorageError {
    /// The tier failure behind a failed save or update.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            StorageError::SaveFailed { source, .. } | StorageError::UpdateFailed { source, .. } => {
                Some(source)
            }
            StorageError::NotFound { .. } => None,
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No storage providers registered")]
    NoProviders,

    #[error("Tier {tier} registered more than once")]
    DuplicateTier { tier: TierId },

    #[error("Tiers {first} and {second} share rank {rank}")]
    DuplicateRank {
        rank: u32,
        first: TierId,
        second: TierId,
    },

    #[error("Tier {tier} has no rank in the priority table")]
    UnrankedTier { tier: TierId },

    #[error("Tier {tier} is not a registered provider")]
    UnregisteredProvider { tier: TierId },

    #[error("Failed to load configuration from {path}: {reason}")]
    Load { path: String, reason: String },
}

/// Master error type for all Stratum errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StratumError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Stratum operations.
pub type StratumResult<T> = Result<T, StratumError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() -> Result<(), ValidationError> {
        let err = StorageError::NotFound {
            id: RecordId::parse("missing-id")?,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Record not found"));
        assert!(msg.contains("missing-id"));
        Ok(())
    }

    #[test]
    fn test_provider_error_reports_tier() {
        let err = ProviderError::Timeout {
            tier: TierId::DATABASE,
            after_ms: 250,
        };
        assert_eq!(err.tier(), &TierId::DATABASE);
        let msg = format!("{}", err);
        assert!(msg.contains("database"));
        assert!(msg.contains("250"));
    }

    #[test]
    fn test_failed_write_keeps_tier_failure() {
        use std::error::Error as _;

        let err = StorageError::UpdateFailed {
            id: RecordId::generate(),
            tier: TierId::FILE,
            source: ProviderError::Timeout {
                tier: TierId::FILE,
                after_ms: 40,
            },
        };
        assert!(matches!(
            err.provider_error(),
            Some(ProviderError::Timeout { after_ms: 40, .. })
        ));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("40ms"));

        let missing = StorageError::NotFound { id: RecordId::generate() };
        assert!(missing.provider_error().is_none());
    }

    #[test]
    fn test_config_error_display_duplicate_rank() {
        let err = ConfigError::DuplicateRank {
            rank: 3,
            first: TierId::CACHE,
            second: TierId::FILE,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("cache"));
        assert!(msg.contains("file"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_stratum_error_from_variants() {
        let provider = StratumError::from(ProviderError::Io {
            tier: TierId::FILE,
            reason: "disk full".to_string(),
        });
        assert!(matches!(provider, StratumError::Provider(_)));

        let storage = StratumError::from(StorageError::SaveFailed {
            tier: TierId::DATABASE,
            source: ProviderError::Unavailable {
                tier: TierId::DATABASE,
                reason: "down".to_string(),
            },
        });
        assert!(matches!(storage, StratumError::Storage(_)));

        let validation = StratumError::from(ValidationError::RequiredFieldMissing {
            field: "value".to_string(),
        });
        assert!(matches!(validation, StratumError::Validation(_)));

        let config = StratumError::from(ConfigError::NoProviders);
        assert!(matches!(config, StratumError::Config(_)));
    }
}
