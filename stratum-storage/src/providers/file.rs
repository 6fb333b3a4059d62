//! File tier - one JSON document per record.
//!
//! # Layout
//!
//! ```text
//! <base_dir>/
//!   <id>.json                serialized Record
//!   <id>.json.<uuid>.tmp     in-flight write, renamed over <id>.json when complete
//! ```
//!
//! Every write gets its own temp file, so concurrent saves of one id never
//! share a half-written file; the last rename wins.
//!
//! Ids become file names, so only `[A-Za-z0-9._-]` are accepted and a leading
//! `.` is refused. Anything else is an [`ProviderError::InvalidKey`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stratum_core::{FileConfig, ProviderError, Record, RecordId, TierId};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::provider::{ProviderResult, StorageProvider};

const RECORD_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";

/// Durable-ish tier storing each record as a file under a base directory.
#[derive(Debug, Clone)]
pub struct FileProvider {
    tier: TierId,
    base_dir: PathBuf,
}

impl FileProvider {
    /// Open (creating if needed) a file tier named [`TierId::FILE`].
    pub async fn open(config: &FileConfig) -> ProviderResult<Self> {
        Self::open_at(TierId::FILE, &config.base_dir).await
    }

    /// Open a file tier rooted at `base_dir` with a custom tier identity.
    pub async fn open_at(tier: TierId, base_dir: impl AsRef<Path>) -> ProviderResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| ProviderError::Io {
                tier: tier.clone(),
                reason: format!("failed to create {}: {}", base_dir.display(), e),
            })?;
        tracing::debug!(tier = %tier, dir = %base_dir.display(), "file tier opened");
        Ok(Self { tier, base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file holding `id`.
    pub fn path_for(&self, id: &RecordId) -> ProviderResult<PathBuf> {
        validate_file_key(id).map_err(|reason| ProviderError::InvalidKey {
            tier: self.tier.clone(),
            id: id.clone(),
            reason: reason.to_string(),
        })?;
        Ok(self
            .base_dir
            .join(format!("{}.{}", id.as_str(), RECORD_EXTENSION)))
    }

    fn io_error(&self, action: &str, path: &Path, err: std::io::Error) -> ProviderError {
        ProviderError::Io {
            tier: self.tier.clone(),
            reason: format!("{} {} failed: {}", action, path.display(), err),
        }
    }

    async fn read(&self, path: &Path) -> ProviderResult<Option<Record>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", path, e)),
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| ProviderError::Serialization {
            tier: self.tier.clone(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(Some(record))
    }

    /// Write to a unique sibling temp file, flush, then rename into place.
    ///
    /// The temp file is removed when any step fails. A write cancelled by a
    /// call timeout can still leave one behind.
    async fn write(&self, path: &Path, record: &Record) -> ProviderResult<()> {
        let payload = serde_json::to_vec_pretty(record).map_err(|e| {
            ProviderError::Serialization {
                tier: self.tier.clone(),
                reason: e.to_string(),
            }
        })?;

        let tmp_path = temp_path_for(path);
        let result = match self.write_temp(&tmp_path, &payload).await {
            Ok(()) => tokio::fs::rename(&tmp_path, path)
                .await
                .map_err(|e| self.io_error("rename", path, e)),
            Err(e) => Err(e),
        };

        if result.is_err() {
            match tokio::fs::remove_file(&tmp_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    tier = %self.tier,
                    path = %tmp_path.display(),
                    error = %e,
                    "failed to remove temp file"
                ),
            }
        }
        result
    }

    async fn write_temp(&self, tmp_path: &Path, payload: &[u8]) -> ProviderResult<()> {
        let mut file = tokio::fs::File::create(tmp_path)
            .await
            .map_err(|e| self.io_error("create", tmp_path, e))?;
        file.write_all(payload)
            .await
            .map_err(|e| self.io_error("write", tmp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| self.io_error("sync", tmp_path, e))
    }
}

/// `<id>.json.<uuid>.tmp` next to the record file.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}{}", Uuid::now_v7().simple(), TEMP_SUFFIX));
    PathBuf::from(name)
}

/// Accept only ids that are safe to use verbatim as a file name.
fn validate_file_key(id: &RecordId) -> Result<(), &'static str> {
    let raw = id.as_str();
    if raw.starts_with('.') {
        return Err("id may not start with '.'");
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("id may only contain ASCII letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

#[async_trait]
impl StorageProvider for FileProvider {
    fn tier(&self) -> &TierId {
        &self.tier
    }

    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>> {
        let path = self.path_for(id)?;
        self.read(&path).await
    }

    async fn save(&self, record: &Record) -> ProviderResult<()> {
        let path = self.path_for(&record.id)?;
        self.write(&path, record).await
    }

    async fn update(&self, record: &Record) -> ProviderResult<bool> {
        let path = self.path_for(&record.id)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                self.write(&path, record).await?;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => Err(self.io_error("stat", &path, e)),
        }
    }

    async fn delete(&self, id: &RecordId) -> ProviderResult<()> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", &path, e)),
        }
    }

    async fn health_check(&self) -> ProviderResult<()> {
        let metadata = tokio::fs::metadata(&self.base_dir)
            .await
            .map_err(|e| self.io_error("stat", &self.base_dir, e))?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(ProviderError::Unavailable {
                tier: self.tier.clone(),
                reason: format!("{} is not a directory", self.base_dir.display()),
            })
        }
    }
}
