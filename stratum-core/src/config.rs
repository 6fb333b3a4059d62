//! Configuration types
//!
//! Values come from environment variables with development defaults, or from a
//! TOML file named by `STRATUM_CONFIG_FILE`. Durations are stored as integer
//! seconds/milliseconds so that both sources read the same way; `0` disables
//! the corresponding limit.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::tier::PriorityTable;

/// Retention policy for the in-memory cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (0 = never expires).
    pub ttl_secs: u64,
    /// Maximum number of entries before the oldest is evicted (0 = unbounded).
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl_secs = secs;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}

/// Location of the file tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/records"),
        }
    }
}

/// Behavior switches for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Write records found in a slower tier back into every faster tier.
    pub refresh_on_read: bool,
    /// Deadline applied to each individual provider call (0 = no deadline).
    pub call_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            refresh_on_read: true,
            call_timeout_ms: 5_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }

    pub fn with_refresh_on_read(mut self, enabled: bool) -> Self {
        self.refresh_on_read = enabled;
        self
    }

    pub fn with_call_timeout_ms(mut self, ms: u64) -> Self {
        self.call_timeout_ms = ms;
        self
    }
}

/// Master configuration for the storage stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StratumConfig {
    pub tier_priority: PriorityTable,
    pub cache: CacheConfig,
    pub file: FileConfig,
    pub orchestrator: OrchestratorConfig,
}

impl StratumConfig {
    /// Load from `STRATUM_CONFIG_FILE` when set, otherwise from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("STRATUM_CONFIG_FILE") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STRATUM_TIER_PRIORITY`: `tier=rank` pairs (default: `cache=0,file=1,database=2`)
    /// - `STRATUM_CACHE_TTL_SECS`: cache entry lifetime (default: 300)
    /// - `STRATUM_CACHE_MAX_ENTRIES`: cache capacity (default: 10000)
    /// - `STRATUM_FILE_DIR`: file tier base directory (default: ./data/records)
    /// - `STRATUM_CALL_TIMEOUT_MS`: per provider call deadline (default: 5000)
    /// - `STRATUM_REFRESH_ON_READ`: "true" or "false" (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tier_priority = match lookup("STRATUM_TIER_PRIORITY") {
            Some(raw) => raw.parse()?,
            None => defaults.tier_priority,
        };

        let cache = CacheConfig {
            ttl_secs: parse_number(&lookup, "STRATUM_CACHE_TTL_SECS")?
                .unwrap_or(defaults.cache.ttl_secs),
            max_entries: parse_number(&lookup, "STRATUM_CACHE_MAX_ENTRIES")?
                .unwrap_or(defaults.cache.max_entries),
        };

        let file = FileConfig {
            base_dir: lookup("STRATUM_FILE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.file.base_dir),
        };

        let orchestrator = OrchestratorConfig {
            refresh_on_read: lookup("STRATUM_REFRESH_ON_READ")
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(defaults.orchestrator.refresh_on_read),
            call_timeout_ms: parse_number(&lookup, "STRATUM_CALL_TIMEOUT_MS")?
                .unwrap_or(defaults.orchestrator.call_timeout_ms),
        };

        let config = Self {
            tier_priority,
            cache,
            file,
            orchestrator,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            ConfigError::Load { reason, .. } => ConfigError::Load {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Load {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tier_priority.validate()?;
        if self.file.base_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "file.base_dir".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierId;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() -> Result<(), ConfigError> {
        let config = StratumConfig::from_lookup(lookup_from(&[]))?;
        assert_eq!(config, StratumConfig::default());
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.orchestrator.call_timeout(), Some(Duration::from_secs(5)));
        assert!(config.orchestrator.refresh_on_read);
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> Result<(), ConfigError> {
        let config = StratumConfig::from_lookup(lookup_from(&[
            ("STRATUM_TIER_PRIORITY", "cache=0,database=1"),
            ("STRATUM_CACHE_TTL_SECS", "0"),
            ("STRATUM_CACHE_MAX_ENTRIES", "42"),
            ("STRATUM_FILE_DIR", "/var/lib/stratum"),
            ("STRATUM_CALL_TIMEOUT_MS", "0"),
            ("STRATUM_REFRESH_ON_READ", "FALSE"),
        ]))?;

        assert_eq!(config.tier_priority.len(), 2);
        assert_eq!(config.tier_priority.rank_of(&TierId::DATABASE), Some(1));
        assert_eq!(config.cache.ttl(), None);
        assert_eq!(config.cache.max_entries, 42);
        assert_eq!(config.file.base_dir, PathBuf::from("/var/lib/stratum"));
        assert_eq!(config.orchestrator.call_timeout(), None);
        assert!(!config.orchestrator.refresh_on_read);
        Ok(())
    }

    #[test]
    fn test_invalid_number_rejected() {
        let result = StratumConfig::from_lookup(lookup_from(&[("STRATUM_CACHE_TTL_SECS", "soon")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_toml_round_trip() -> Result<(), ConfigError> {
        let raw = r#"
            tier_priority = [
                { tier = "cache", rank = 0 },
                { tier = "database", rank = 10 },
            ]

            [cache]
            ttl_secs = 60

            [orchestrator]
            refresh_on_read = false
        "#;
        let config = StratumConfig::from_toml_str(raw)?;
        assert_eq!(config.tier_priority.rank_of(&TierId::DATABASE), Some(10));
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, CacheConfig::default().max_entries);
        assert!(!config.orchestrator.refresh_on_read);
        Ok(())
    }

    #[test]
    fn test_toml_with_duplicate_rank_rejected() {
        let raw = r#"
            tier_priority = [
                { tier = "cache", rank = 0 },
                { tier = "file", rank = 0 },
            ]
        "#;
        assert!(matches!(
            StratumConfig::from_toml_str(raw),
            Err(ConfigError::DuplicateRank { .. })
        ));
    }

    #[test]
    fn test_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stratum.toml");
        std::fs::write(&path, "[file]\nbase_dir = \"/tmp/records\"\n")?;

        let config = StratumConfig::from_file(&path)?;
        assert_eq!(config.file.base_dir, PathBuf::from("/tmp/records"));

        let missing = StratumConfig::from_file(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Load { .. })));
        Ok(())
    }
}
