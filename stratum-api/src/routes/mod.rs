//! REST API Routes Module
//!
//! - Record CRUD under /api/v1/records
//! - Health checks at /health/* (Kubernetes-compatible)
//! - Prometheus metrics at /metrics
//! - OpenAPI document at /api-docs/openapi.json
//! - CORS support for browser-based clients

pub mod health;
pub mod records;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::openapi::ApiDoc;
use crate::state::ApiState;
use crate::telemetry::metrics_handler;

/// Handler for /api-docs/openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router.
///
/// - Record routes under /api/v1/records
/// - Health checks at /health/*
/// - Prometheus metrics at /metrics
/// - OpenAPI document at /api-docs/openapi.json
///
/// Every request is traced and passes through the CORS layer.
pub fn create_api_router(state: ApiState, api_config: &ApiConfig) -> Router {
    let metrics = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(state.clone()));

    Router::new()
        .nest("/api/v1/records", records::create_router(state.orchestrator.clone()))
        .nest("/health", health::create_router(state.orchestrator))
        .merge(metrics)
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(api_config)),
        )
}
