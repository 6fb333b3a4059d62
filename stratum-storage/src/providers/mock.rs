//! In-memory provider standing in for a real backend.
//!
//! Used as the database tier in tests and in servers started without a
//! database. It has no retention policy: what is saved stays until deleted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use stratum_core::{ProviderError, Record, RecordId, TierId};

use crate::provider::{ProviderResult, StorageProvider};

/// Mock storage keyed by record id.
#[derive(Debug, Clone)]
pub struct MockProvider {
    tier: TierId,
    records: Arc<RwLock<HashMap<RecordId, Record>>>,
}

impl MockProvider {
    /// Create an empty mock reporting `tier`.
    pub fn new(tier: TierId) -> Self {
        Self {
            tier,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }

    /// Get count of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record with `id` is stored, bypassing the async contract.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records
            .read()
            .map(|r| r.contains_key(id))
            .unwrap_or(false)
    }

    /// Copy of the stored record, bypassing the async contract.
    pub fn peek(&self, id: &RecordId) -> Option<Record> {
        self.records.read().ok().and_then(|r| r.get(id).cloned())
    }

    fn read(&self) -> ProviderResult<RwLockReadGuard<'_, HashMap<RecordId, Record>>> {
        self.records.read().map_err(|_| self.poisoned())
    }

    fn write(&self) -> ProviderResult<RwLockWriteGuard<'_, HashMap<RecordId, Record>>> {
        self.records.write().map_err(|_| self.poisoned())
    }

    fn poisoned(&self) -> ProviderError {
        ProviderError::Backend {
            tier: self.tier.clone(),
            reason: "storage lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn tier(&self) -> &TierId {
        &self.tier
    }

    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn save(&self, record: &Record) -> ProviderResult<()> {
        self.write()?.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &Record) -> ProviderResult<bool> {
        let mut records = self.write()?;
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &RecordId) -> ProviderResult<()> {
        self.write()?.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_crud() -> Result<(), ProviderError> {
        let mock = MockProvider::new(TierId::DATABASE);
        let mut record = Record::new("x");

        assert!(mock.get(&record.id).await?.is_none());
        assert!(!mock.update(&record).await?);

        mock.save(&record).await?;
        mock.save(&record).await?;
        assert_eq!(mock.len(), 1);

        record.overwrite("y");
        assert!(mock.update(&record).await?);
        assert_eq!(mock.peek(&record.id), Some(record.clone()));

        mock.delete(&record.id).await?;
        mock.delete(&record.id).await?;
        assert!(mock.is_empty());
        Ok(())
    }

    #[test]
    fn test_clones_share_storage() {
        let mock = MockProvider::new(TierId::DATABASE);
        let clone = mock.clone();
        if let Ok(mut records) = clone.records.write() {
            let record = Record::new("shared");
            records.insert(record.id.clone(), record);
        }
        assert_eq!(mock.len(), 1);
        mock.clear();
        assert!(clone.is_empty());
    }
}
