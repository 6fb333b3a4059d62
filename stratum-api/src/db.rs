//! Database Tier
//!
//! PostgreSQL connection pooling using deadpool-postgres and the
//! [`PostgresProvider`] that serves the `database` tier from a single table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS stratum_records (
//!     id          TEXT PRIMARY KEY,
//!     value       TEXT NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolError, RecyclingMethod, Runtime};
use stratum_core::{ProviderError, Record, RecordId, TierId};
use stratum_storage::{ProviderResult, StorageProvider};
use tokio_postgres::NoTls;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Serve the database tier from PostgreSQL; when false an in-memory
    /// stand-in is used instead.
    pub enabled: bool,
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait for a pooled connection at most this long
    pub timeout: Duration,
    /// Table holding the records
    pub table: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 5432,
            dbname: "stratum".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            table: "stratum_records".to_string(),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STRATUM_DB_ENABLED`: "false" selects the in-memory stand-in (default: true)
    /// - `STRATUM_DB_HOST`, `STRATUM_DB_PORT`, `STRATUM_DB_NAME`
    /// - `STRATUM_DB_USER`, `STRATUM_DB_PASSWORD`
    /// - `STRATUM_DB_POOL_SIZE`: maximum pooled connections (default: 16)
    /// - `STRATUM_DB_TIMEOUT`: seconds to wait for a connection (default: 30)
    /// - `STRATUM_DB_TABLE`: record table (default: stratum_records)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            enabled: lookup("STRATUM_DB_ENABLED")
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(defaults.enabled),
            host: lookup("STRATUM_DB_HOST").unwrap_or(defaults.host),
            port: lookup("STRATUM_DB_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: lookup("STRATUM_DB_NAME").unwrap_or(defaults.dbname),
            user: lookup("STRATUM_DB_USER").unwrap_or(defaults.user),
            password: lookup("STRATUM_DB_PASSWORD").unwrap_or_default(),
            max_size: lookup("STRATUM_DB_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: lookup("STRATUM_DB_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            table: lookup("STRATUM_DB_TABLE").unwrap_or(defaults.table),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the pool is first used.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::service_unavailable(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SQL
// ============================================================================

/// Statements bound to one record table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statements {
    create: String,
    select: String,
    upsert: String,
    update: String,
    delete: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 id TEXT PRIMARY KEY, \
                 value TEXT NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL)"
            ),
            select: format!("SELECT id, value, created_at FROM {table} WHERE id = $1"),
            upsert: format!(
                "INSERT INTO {table} (id, value, created_at) VALUES ($1, $2, $3) \
                 ON CONFLICT (id) DO UPDATE SET value = EXCLUDED.value, created_at = EXCLUDED.created_at"
            ),
            update: format!("UPDATE {table} SET value = $2, created_at = $3 WHERE id = $1"),
            delete: format!("DELETE FROM {table} WHERE id = $1"),
        }
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> ApiResult<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest && table.len() <= 63 {
        Ok(())
    } else {
        Err(ApiError::invalid_input(format!(
            "Invalid table name '{}': expected lowercase letters, digits and '_'",
            table
        )))
    }
}

// ============================================================================
// POSTGRES PROVIDER
// ============================================================================

/// The `database` tier backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresProvider {
    tier: TierId,
    pool: Pool,
    sql: Statements,
}

impl std::fmt::Debug for PostgresProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresProvider")
            .field("tier", &self.tier)
            .field("pool_size", &self.pool.status().size)
            .finish()
    }
}

impl PostgresProvider {
    /// Create a provider over `pool` storing records in `table`.
    pub fn new(pool: Pool, table: &str) -> ApiResult<Self> {
        validate_table_name(table)?;
        Ok(Self {
            tier: TierId::DATABASE,
            pool,
            sql: Statements::for_table(table),
        })
    }

    /// Create the record table if it does not exist yet.
    pub async fn ensure_schema(&self) -> ProviderResult<()> {
        let conn = self.conn().await?;
        conn.batch_execute(&self.sql.create)
            .await
            .map_err(|e| self.query_error(e))?;
        tracing::info!(tier = %self.tier, "record table ready");
        Ok(())
    }

    async fn conn(&self) -> ProviderResult<Object> {
        self.pool.get().await.map_err(|e| self.pool_error(e))
    }

    fn pool_error(&self, err: PoolError) -> ProviderError {
        tracing::error!("Connection pool error: {:?}", err);
        match err {
            PoolError::Timeout(_) => ProviderError::Unavailable {
                tier: self.tier.clone(),
                reason: "connection pool exhausted".to_string(),
            },
            PoolError::Closed => ProviderError::Unavailable {
                tier: self.tier.clone(),
                reason: "connection pool is closed".to_string(),
            },
            other => ProviderError::Unavailable {
                tier: self.tier.clone(),
                reason: other.to_string(),
            },
        }
    }

    fn query_error(&self, err: tokio_postgres::Error) -> ProviderError {
        ProviderError::Backend {
            tier: self.tier.clone(),
            reason: err.to_string(),
        }
    }

    fn decode(&self, row: &tokio_postgres::Row) -> ProviderResult<Record> {
        let decode_error = |reason: String| ProviderError::Serialization {
            tier: self.tier.clone(),
            reason,
        };
        let id: String = row.try_get(0).map_err(|e| decode_error(e.to_string()))?;
        let value: String = row.try_get(1).map_err(|e| decode_error(e.to_string()))?;
        let created_at: DateTime<Utc> = row.try_get(2).map_err(|e| decode_error(e.to_string()))?;
        let id = RecordId::parse(id).map_err(|e| decode_error(e.to_string()))?;
        Ok(Record::with_id(id, value, created_at))
    }
}

#[async_trait]
impl StorageProvider for PostgresProvider {
    fn tier(&self) -> &TierId {
        &self.tier
    }

    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(&self.sql.select, &[&id.as_str()])
            .await
            .map_err(|e| self.query_error(e))?;
        row.as_ref().map(|row| self.decode(row)).transpose()
    }

    async fn save(&self, record: &Record) -> ProviderResult<()> {
        let conn = self.conn().await?;
        conn.execute(
            &self.sql.upsert,
            &[&record.id.as_str(), &record.value, &record.created_at],
        )
        .await
        .map_err(|e| self.query_error(e))?;
        Ok(())
    }

    async fn update(&self, record: &Record) -> ProviderResult<bool> {
        let conn = self.conn().await?;
        let rows = conn
            .execute(
                &self.sql.update,
                &[&record.id.as_str(), &record.value, &record.created_at],
            )
            .await
            .map_err(|e| self.query_error(e))?;
        Ok(rows > 0)
    }

    async fn delete(&self, id: &RecordId) -> ProviderResult<()> {
        let conn = self.conn().await?;
        conn.execute(&self.sql.delete, &[&id.as_str()])
            .await
            .map_err(|e| self.query_error(e))?;
        Ok(())
    }

    async fn health_check(&self) -> ProviderResult<()> {
        let conn = self.conn().await?;
        // Simple query to verify connectivity
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| self.query_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, DbConfig::default());
        assert!(config.enabled);
        assert_eq!(config.table, "stratum_records");
    }

    #[test]
    fn test_db_config_overrides() {
        let config = DbConfig::from_lookup(lookup_from(&[
            ("STRATUM_DB_ENABLED", "false"),
            ("STRATUM_DB_HOST", "db.internal"),
            ("STRATUM_DB_PORT", "6543"),
            ("STRATUM_DB_POOL_SIZE", "4"),
            ("STRATUM_DB_TIMEOUT", "2"),
            ("STRATUM_DB_TABLE", "records_v2"),
        ]));
        assert!(!config.enabled);
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.max_size, 4);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.table, "records_v2");
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("stratum_records").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("records; DROP TABLE x").is_err());
        assert!(validate_table_name("Records").is_err());
    }

    #[test]
    fn test_statements_target_table() {
        let sql = Statements::for_table("records_v2");
        assert!(sql.create.starts_with("CREATE TABLE IF NOT EXISTS records_v2"));
        assert!(sql.select.contains("FROM records_v2 WHERE id = $1"));
        assert!(sql.upsert.contains("ON CONFLICT (id) DO UPDATE"));
        assert!(sql.update.starts_with("UPDATE records_v2"));
        assert!(sql.delete.starts_with("DELETE FROM records_v2"));
    }
}
