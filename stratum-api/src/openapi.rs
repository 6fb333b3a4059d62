//! OpenAPI Specification for the Stratum API
//!
//! Generated by utoipa from the route annotations and response types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::records::{RecordIdResponse, RecordResponse, RecordValueRequest};
use crate::routes::{health, records};
use crate::telemetry::metrics;

/// OpenAPI document for the Stratum API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stratum API",
        version = "0.1.0",
        description = "Tiered record storage: cache, file and database behind one interface",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Records", description = "Fetch, create, replace and delete records"),
        (name = "Health", description = "Liveness and per-tier readiness"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        records::get_record,
        records::create_record,
        records::update_record,
        records::delete_record,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        RecordResponse,
        RecordValueRequest,
        RecordIdResponse,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
        ApiError,
        ErrorCode,
    ))
)]
pub struct ApiDoc;
