//! Stratum Core - Record, Tier and Error Types
//!
//! Pure data structures shared by every other crate in the workspace.
//! This crate performs no I/O besides reading configuration files.

pub mod config;
pub mod error;
pub mod record;
pub mod tier;

pub use config::{CacheConfig, FileConfig, OrchestratorConfig, StratumConfig};
pub use error::{
    ConfigError, ProviderError, StorageError, StratumError, StratumResult, ValidationError,
};
pub use record::{validate_value, Record, RecordId, Timestamp};
pub use tier::{PriorityTable, TierId, TierPriority};
