//! Stratum API Server Entry Point
//!
//! Bootstraps configuration, assembles the tier stack and starts the Axum
//! HTTP server.

use axum::Router;
use stratum_api::telemetry::{init_tracer, TelemetryConfig};
use stratum_api::{build_state, create_api_router, ApiConfig, ApiError, ApiResult, DbConfig};
use stratum_core::StratumConfig;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let stratum_config = StratumConfig::load()?;
    let db_config = DbConfig::from_env();
    let api_config = ApiConfig::from_env()?;

    let state = build_state(&stratum_config, &db_config).await?;
    let app: Router = create_api_router(state, &api_config);

    let addr = api_config.socket_addr()?;
    tracing::info!(%addr, "Starting Stratum API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
