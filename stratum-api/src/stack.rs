//! Assembly of the tier stack from configuration.

use std::sync::Arc;

use stratum_core::{StratumConfig, TierId};
use stratum_storage::{
    FileProvider, MemoryCacheProvider, MockProvider, Orchestrator, ProviderRegistry,
    SharedProvider,
};

use crate::db::{DbConfig, PostgresProvider};
use crate::error::ApiResult;
use crate::state::ApiState;
use crate::telemetry::PrometheusObserver;

/// Build the cache, file and database tiers and the orchestrator over them.
///
/// With the database disabled the `database` tier is an in-memory stand-in,
/// which keeps the three-tier topology but loses durability. Every provider
/// call is reported to the Prometheus metrics.
pub async fn build_state(config: &StratumConfig, db_config: &DbConfig) -> ApiResult<ApiState> {
    let memory = Arc::new(MemoryCacheProvider::new(&config.cache));
    let cache: SharedProvider = memory.clone();
    let file: SharedProvider = Arc::new(FileProvider::open(&config.file).await?);

    let database: SharedProvider = if db_config.enabled {
        let pool = db_config.create_pool()?;
        let provider = PostgresProvider::new(pool, &db_config.table)?;
        provider.ensure_schema().await?;
        Arc::new(provider)
    } else {
        tracing::warn!("database tier disabled, using in-memory stand-in");
        Arc::new(MockProvider::new(TierId::DATABASE))
    };

    let registry = ProviderRegistry::new(&config.tier_priority, vec![cache, file, database])?;
    tracing::info!(registry = ?registry, "tier stack ready");

    let orchestrator = Orchestrator::new(registry, config.orchestrator.clone())
        .with_observer(Arc::new(PrometheusObserver));
    Ok(ApiState::new(orchestrator).with_cache(memory))
}
