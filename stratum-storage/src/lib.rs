//! Stratum Storage - tiered record storage
//!
//! This crate provides:
//! - [`StorageProvider`]: the per-tier CRUD contract
//! - [`ProviderRegistry`]: providers ordered by an injected priority table
//! - [`Orchestrator`]: read-through, write-through record storage across tiers
//! - [`CallObserver`]: per-call hook used for metrics
//! - Built-in tiers: in-memory cache, JSON files, and an in-memory mock

pub mod observe;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod registry;

pub use observe::{CallKind, CallObserver};
pub use orchestrator::{DeleteReport, FoundIn, Orchestrator, SearchResult, TierOutcome};
pub use provider::{ProviderResult, SharedProvider, StorageProvider};
pub use providers::{CacheStats, FileProvider, MemoryCacheProvider, MockProvider};
pub use registry::ProviderRegistry;

// Re-export core types for convenience
pub use stratum_core::{
    OrchestratorConfig, PriorityTable, ProviderError, Record, RecordId, StorageError,
    StratumError, StratumResult, TierId,
};
