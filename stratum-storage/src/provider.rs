//! The storage provider contract implemented once per tier.

use std::sync::Arc;

use async_trait::async_trait;
use stratum_core::{ProviderError, Record, RecordId, TierId};

/// Result type returned by every provider call.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Uniform CRUD contract for one storage tier.
///
/// Implementations are independent of each other and never call another
/// tier. "Not found" is a normal outcome everywhere:
///
/// - `get` answers `Ok(None)`
/// - `update` answers `Ok(false)` when the tier holds no copy (eviction, expiry)
/// - `delete` of an absent id is `Ok(())`
///
/// `Err` is reserved for genuine tier failures (I/O, backend, timeout).
/// Callers never pass blank ids; the orchestrator validates them first.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Tier identity used for registry ordering and lookup.
    fn tier(&self) -> &TierId;

    /// Fetch a record.
    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>>;

    /// Insert a record, overwriting any copy with the same id.
    async fn save(&self, record: &Record) -> ProviderResult<()>;

    /// Replace an existing record. Returns `Ok(false)` if no copy exists.
    async fn update(&self, record: &Record) -> ProviderResult<bool>;

    /// Remove a record. Idempotent.
    async fn delete(&self, id: &RecordId) -> ProviderResult<()>;

    /// Probe tier availability.
    async fn health_check(&self) -> ProviderResult<()> {
        Ok(())
    }
}

/// Providers are shared between the registry and their owners.
pub type SharedProvider = Arc<dyn StorageProvider>;

#[async_trait]
impl<P> StorageProvider for Arc<P>
where
    P: StorageProvider + ?Sized,
{
    fn tier(&self) -> &TierId {
        (**self).tier()
    }

    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>> {
        (**self).get(id).await
    }

    async fn save(&self, record: &Record) -> ProviderResult<()> {
        (**self).save(record).await
    }

    async fn update(&self, record: &Record) -> ProviderResult<bool> {
        (**self).update(record).await
    }

    async fn delete(&self, id: &RecordId) -> ProviderResult<()> {
        (**self).delete(id).await
    }

    async fn health_check(&self) -> ProviderResult<()> {
        (**self).health_check().await
    }
}
