//! Stratum Test Utilities
//!
//! Shared test infrastructure for the Stratum workspace:
//! - [`FaultyProvider`]: wraps any tier, counts calls and injects failures
//! - Proptest generators for records and ids
//! - Fixtures assembling the standard cache/file/database stack
//! - Assertions over [`StratumResult`] error variants

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stratum_storage::{ProviderResult, StorageProvider};

// Re-export core types for convenience
pub use stratum_core::{
    OrchestratorConfig, PriorityTable, ProviderError, Record, RecordId, StorageError,
    StratumError, StratumResult, TierId, ValidationError,
};
pub use stratum_storage::{MemoryCacheProvider, MockProvider, Orchestrator, ProviderRegistry};

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Provider operations that can be counted and failed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Save,
    Update,
    Delete,
    HealthCheck,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Get,
        Operation::Save,
        Operation::Update,
        Operation::Delete,
        Operation::HealthCheck,
    ];

    fn index(self) -> usize {
        match self {
            Operation::Get => 0,
            Operation::Save => 1,
            Operation::Update => 2,
            Operation::Delete => 3,
            Operation::HealthCheck => 4,
        }
    }
}

/// Wraps a provider so tests can observe and sabotage it.
///
/// A failing operation is still counted but never reaches the inner provider;
/// it answers [`ProviderError::Unavailable`] instead.
#[derive(Debug)]
pub struct FaultyProvider<P> {
    inner: P,
    faults: [AtomicBool; 5],
    calls: [AtomicUsize; 5],
    delay_ms: AtomicU64,
}

impl<P: StorageProvider> FaultyProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            faults: Default::default(),
            calls: Default::default(),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Make every future `op` call fail.
    pub fn fail(&self, op: Operation) {
        self.faults[op.index()].store(true, Ordering::SeqCst);
    }

    /// Let `op` through again.
    pub fn heal(&self, op: Operation) {
        self.faults[op.index()].store(false, Ordering::SeqCst);
    }

    pub fn heal_all(&self) {
        for op in Operation::ALL {
            self.heal(op);
        }
    }

    pub fn is_failing(&self, op: Operation) -> bool {
        self.faults[op.index()].load(Ordering::SeqCst)
    }

    /// Number of `op` calls seen, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        Operation::ALL.iter().map(|op| self.calls(*op)).sum()
    }

    pub fn reset_calls(&self) {
        for counter in &self.calls {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Sleep this long before every call (zero disables).
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self, op: Operation) -> ProviderResult<()> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.is_failing(op) {
            return Err(ProviderError::Unavailable {
                tier: self.inner.tier().clone(),
                reason: format!("injected {:?} failure", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<P: StorageProvider> StorageProvider for FaultyProvider<P> {
    fn tier(&self) -> &TierId {
        self.inner.tier()
    }

    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>> {
        self.enter(Operation::Get).await?;
        self.inner.get(id).await
    }

    async fn save(&self, record: &Record) -> ProviderResult<()> {
        self.enter(Operation::Save).await?;
        self.inner.save(record).await
    }

    async fn update(&self, record: &Record) -> ProviderResult<bool> {
        self.enter(Operation::Update).await?;
        self.inner.update(record).await
    }

    async fn delete(&self, id: &RecordId) -> ProviderResult<()> {
        self.enter(Operation::Delete).await?;
        self.inner.delete(id).await
    }

    async fn health_check(&self) -> ProviderResult<()> {
        self.enter(Operation::HealthCheck).await?;
        self.inner.health_check().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest generators for Stratum types.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use stratum_core::Timestamp;

    /// Non-blank payloads.
    pub fn arb_value() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9 _.,:-]{0,63}"
    }

    /// Payloads made only of whitespace (rejected by validation).
    pub fn arb_blank_value() -> impl Strategy<Value = String> {
        "[ \t\n]{0,8}"
    }

    /// Ids accepted by every built-in tier, file names included.
    pub fn arb_record_id() -> impl Strategy<Value = RecordId> {
        "[a-zA-Z0-9][a-zA-Z0-9_-]{0,35}".prop_filter_map("blank id", |raw| RecordId::parse(raw).ok())
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1_577_836_800i64..1_893_456_000i64)
            .prop_filter_map("out of range", |secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn arb_record() -> impl Strategy<Value = Record> {
        (arb_record_id(), arb_value(), arb_timestamp())
            .prop_map(|(id, value, created_at)| Record::with_id(id, value, created_at))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! The standard three-tier stack, every tier wrapped in a [`FaultyProvider`].

    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use stratum_core::ConfigError;
    use stratum_storage::{FileProvider, SharedProvider};

    /// Cache, file and database tiers plus the orchestrator over them.
    pub struct TierStack<F = MockProvider> {
        pub cache: Arc<FaultyProvider<MemoryCacheProvider>>,
        pub file: Arc<FaultyProvider<F>>,
        pub database: Arc<FaultyProvider<MockProvider>>,
        pub orchestrator: Orchestrator,
    }

    impl<F: StorageProvider + 'static> TierStack<F> {
        fn assemble(file: F, config: OrchestratorConfig) -> Result<Self, ConfigError> {
            let cache = Arc::new(FaultyProvider::new(MemoryCacheProvider::unbounded()));
            let file = Arc::new(FaultyProvider::new(file));
            let database = Arc::new(FaultyProvider::new(MockProvider::new(TierId::DATABASE)));

            let providers: Vec<SharedProvider> = vec![
                cache.clone() as SharedProvider,
                file.clone() as SharedProvider,
                database.clone() as SharedProvider,
            ];
            let registry = ProviderRegistry::new(&PriorityTable::standard(), providers)?;

            Ok(Self {
                cache,
                file,
                database,
                orchestrator: Orchestrator::new(registry, config),
            })
        }

        /// Copies of `id` per tier, fastest first, read directly from each tier.
        pub async fn copies(&self, id: &RecordId) -> ProviderResult<[Option<Record>; 3]> {
            Ok([
                self.cache.inner().get(id).await?,
                self.file.inner().get(id).await?,
                self.database.inner().get(id).await?,
            ])
        }

        /// True when no tier holds `id`.
        pub async fn absent_everywhere(&self, id: &RecordId) -> ProviderResult<bool> {
            Ok(self.copies(id).await?.iter().all(Option::is_none))
        }

        pub fn heal_all(&self) {
            self.cache.heal_all();
            self.file.heal_all();
            self.database.heal_all();
        }

        pub fn reset_calls(&self) {
            self.cache.reset_calls();
            self.file.reset_calls();
            self.database.reset_calls();
        }
    }

    /// In-memory stack with default orchestrator settings.
    pub fn mock_stack() -> Result<TierStack, ConfigError> {
        mock_stack_with(OrchestratorConfig::default())
    }

    pub fn mock_stack_with(config: OrchestratorConfig) -> Result<TierStack, ConfigError> {
        TierStack::assemble(MockProvider::new(TierId::FILE), config)
    }

    /// Stack whose file tier writes JSON documents under `dir`.
    pub async fn file_stack(dir: &Path) -> StratumResult<TierStack<FileProvider>> {
        let file = FileProvider::open_at(TierId::FILE, dir).await?;
        Ok(TierStack::assemble(file, OrchestratorConfig::default())?)
    }

    /// A record already present in `provider`, bypassing the orchestrator.
    pub async fn seeded<P: StorageProvider + ?Sized>(
        provider: &P,
        value: &str,
    ) -> ProviderResult<Record> {
        let record = Record::new(value);
        provider.save(&record).await?;
        Ok(record)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Stratum error variants.

    use super::*;

    /// Assert that a StratumResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &StratumResult<T>) {
        match result {
            Err(StratumError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a StratumResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &StratumResult<T>) {
        match result {
            Err(StratumError::Storage(StorageError::NotFound { .. })) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a save failed at `tier`.
    #[track_caller]
    pub fn assert_save_failed<T: std::fmt::Debug>(result: &StratumResult<T>, tier: &TierId) {
        match result {
            Err(StratumError::Storage(StorageError::SaveFailed { tier: t, .. })) => {
                assert_eq!(t, tier, "Wrong tier in SaveFailed error");
            }
            other => panic!("Expected SaveFailed at {}, got: {:?}", tier, other),
        }
    }

    /// Assert that an update failed at `tier`.
    #[track_caller]
    pub fn assert_update_failed<T: std::fmt::Debug>(result: &StratumResult<T>, tier: &TierId) {
        match result {
            Err(StratumError::Storage(StorageError::UpdateFailed { tier: t, .. })) => {
                assert_eq!(t, tier, "Wrong tier in UpdateFailed error");
            }
            other => panic!("Expected UpdateFailed at {}, got: {:?}", tier, other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
