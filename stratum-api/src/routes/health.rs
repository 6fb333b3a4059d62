//! Health Check Endpoints
//!
//! Provides Kubernetes-compatible health check endpoints:
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Every storage tier answers its health check

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stratum_storage::{Orchestrator, TierOutcome};

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthDetails {
    /// One entry per tier, fastest first
    pub tiers: Vec<ComponentHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub orchestrator: Orchestrator,
    pub start_time: std::time::Instant,
}

impl HealthState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            start_time: std::time::Instant::now(),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
)]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (every tier)
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Every tier is healthy", body = HealthResponse),
        (status = 503, description = "At least one tier is unhealthy", body = HealthResponse),
    ),
)]
pub async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let tiers: Vec<ComponentHealth> = state
        .orchestrator
        .tier_health()
        .await
        .into_iter()
        .map(|(tier, outcome)| match outcome {
            TierOutcome::Succeeded => ComponentHealth {
                name: tier.to_string(),
                status: HealthStatus::Healthy,
                error: None,
            },
            TierOutcome::Failed(err) => ComponentHealth {
                name: tier.to_string(),
                status: HealthStatus::Unhealthy,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let overall_status = overall(&tiers);

    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            tiers,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

/// Healthy when all tiers are, unhealthy when none are, degraded otherwise.
fn overall(tiers: &[ComponentHealth]) -> HealthStatus {
    let healthy = tiers
        .iter()
        .filter(|t| t.status == HealthStatus::Healthy)
        .count();
    if healthy == tiers.len() {
        HealthStatus::Healthy
    } else if healthy == 0 {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(HealthState::new(orchestrator));

    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}
