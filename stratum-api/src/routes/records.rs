//! Record REST API Routes
//!
//! Axum handlers mapping the HTTP surface onto the orchestrator's
//! fetch, create, replace and delete operations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stratum_core::Record;
use stratum_storage::{Orchestrator, TierOutcome};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// TYPES
// ============================================================================

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecordResponse {
    pub id: String,
    pub value: String,
    /// Time of the last write
    pub created_at: DateTime<Utc>,
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        Self {
            id: record.id.into_inner(),
            value: record.value,
            created_at: record.created_at,
        }
    }
}

/// Body of create and replace requests.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecordValueRequest {
    /// Payload to store; must not be blank
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecordIdResponse {
    pub id: String,
}

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for record routes.
#[derive(Clone)]
pub struct RecordState {
    pub orchestrator: Orchestrator,
}

impl RecordState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/records/{id} - Fetch a record
#[utoipa::path(
    get,
    path = "/api/v1/records/{id}",
    tag = "Records",
    params(
        ("id" = String, Path, description = "Record ID"),
    ),
    responses(
        (status = 200, description = "Record found", body = RecordResponse),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 404, description = "Record not found", body = ApiError),
    ),
)]
pub async fn get_record(
    State(state): State<Arc<RecordState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordResponse>> {
    let record = state
        .orchestrator
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Record", &id))?;

    Ok(Json(record.into()))
}

/// POST /api/v1/records - Create a record
#[utoipa::path(
    post,
    path = "/api/v1/records",
    tag = "Records",
    request_body = RecordValueRequest,
    responses(
        (status = 201, description = "Record created", body = RecordIdResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 500, description = "A storage tier failed", body = ApiError),
    ),
)]
pub async fn create_record(
    State(state): State<Arc<RecordState>>,
    Json(req): Json<RecordValueRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = state.orchestrator.save(&req.value).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordIdResponse {
            id: id.into_inner(),
        }),
    ))
}

/// PUT /api/v1/records/{id} - Replace a record's value
#[utoipa::path(
    put,
    path = "/api/v1/records/{id}",
    tag = "Records",
    params(
        ("id" = String, Path, description = "Record ID"),
    ),
    request_body = RecordValueRequest,
    responses(
        (status = 200, description = "Record updated", body = RecordIdResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Record not found", body = ApiError),
        (status = 500, description = "A storage tier failed", body = ApiError),
    ),
)]
pub async fn update_record(
    State(state): State<Arc<RecordState>>,
    Path(id): Path<String>,
    Json(req): Json<RecordValueRequest>,
) -> ApiResult<Json<RecordIdResponse>> {
    let id = state.orchestrator.update(&id, &req.value).await?;

    Ok(Json(RecordIdResponse {
        id: id.into_inner(),
    }))
}

/// DELETE /api/v1/records/{id} - Delete a record from every tier
#[utoipa::path(
    delete,
    path = "/api/v1/records/{id}",
    tag = "Records",
    params(
        ("id" = String, Path, description = "Record ID"),
    ),
    responses(
        (status = 204, description = "Record deleted from every tier"),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 500, description = "At least one tier failed", body = ApiError),
    ),
)]
pub async fn delete_record(
    State(state): State<Arc<RecordState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let report = state.orchestrator.delete(&id).await?;

    if report.is_complete() {
        return Ok(StatusCode::NO_CONTENT);
    }

    let tiers: Vec<serde_json::Value> = report
        .outcomes
        .iter()
        .map(|(tier, outcome)| match outcome {
            TierOutcome::Succeeded => serde_json::json!({ "tier": tier.as_str(), "deleted": true }),
            TierOutcome::Failed(err) => {
                tracing::error!(tier = %tier, error = %err, "tier delete failed");
                serde_json::json!({ "tier": tier.as_str(), "deleted": false })
            }
        })
        .collect();

    Err(
        ApiError::storage_failure(format!("Record '{}' was not deleted from every tier", report.id))
            .with_details(serde_json::json!({ "tiers": tiers })),
    )
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the record router.
pub fn create_router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(RecordState::new(orchestrator));

    Router::new()
        .route("/", axum::routing::post(create_record))
        .route(
            "/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(state)
}
