//! Error Types for the Stratum API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use stratum_core::{
    ConfigError, ProviderError, StorageError, StratumError, ValidationError,
};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested record does not exist
    EntityNotFound,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// A storage tier rejected the operation
    StorageFailure,

    /// Internal server error
    InternalError,

    /// A storage tier is temporarily unavailable
    ServiceUnavailable,

    /// A storage tier did not answer in time
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::MissingField => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::StorageFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::StorageFailure => "Storage operation failed",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Operation timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (failing tier, per-tier outcomes)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id '{}' not found", entity_type, id),
        )
    }

    /// Create a StorageFailure error.
    pub fn storage_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageFailure, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
        }
    }
}

/// 504 when the tier timed out, 503 when it is down, 500 for anything else.
fn code_for(err: &ProviderError) -> ErrorCode {
    match err {
        ProviderError::Timeout { .. } => ErrorCode::Timeout,
        ProviderError::Unavailable { .. } => ErrorCode::ServiceUnavailable,
        _ => ErrorCode::StorageFailure,
    }
}

/// Tier failures are logged in full; the response names the tier only.
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        tracing::error!(error = %err, "provider error");
        let details = serde_json::json!({ "tier": err.tier().as_str() });
        ApiError::from_code(code_for(&err)).with_details(details)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id } => ApiError::entity_not_found("Record", id),
            StorageError::SaveFailed { tier, source } => {
                tracing::error!(tier = %tier, error = %source, "save failed");
                ApiError::new(code_for(&source), "Failed to save record")
                    .with_details(serde_json::json!({ "tier": tier.as_str() }))
            }
            StorageError::UpdateFailed { id, tier, source } => {
                tracing::error!(id = %id, tier = %tier, error = %source, "update failed");
                ApiError::new(code_for(&source), format!("Failed to update record '{}'", id))
                    .with_details(serde_json::json!({ "tier": tier.as_str() }))
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!(error = %err, "configuration error");
        ApiError::internal_error(format!("Configuration error: {}", err))
    }
}

impl From<StratumError> for ApiError {
    fn from(err: StratumError) -> Self {
        match err {
            StratumError::Validation(e) => e.into(),
            StratumError::Storage(e) => e.into(),
            StratumError::Provider(e) => e.into(),
            StratumError::Config(e) => e.into(),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::{RecordId, TierId};

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::MissingField.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EntityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StorageFailure.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = StratumError::from(ValidationError::RequiredFieldMissing {
            field: "value".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("value"));
    }

    #[test]
    fn test_not_found_maps_to_404() -> Result<(), ValidationError> {
        let id = RecordId::parse("missing-id")?;
        let err: ApiError = StratumError::from(StorageError::NotFound { id }).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.message.contains("missing-id"));
        Ok(())
    }

    #[test]
    fn test_save_failure_hides_reason() {
        let err: ApiError = StratumError::from(StorageError::SaveFailed {
            tier: TierId::DATABASE,
            source: ProviderError::Backend {
                tier: TierId::DATABASE,
                reason: "password authentication failed".to_string(),
            },
        })
        .into();
        assert_eq!(err.code, ErrorCode::StorageFailure);
        assert!(!err.message.contains("password"));
        assert_eq!(err.details, Some(serde_json::json!({ "tier": "database" })));
    }

    #[test]
    fn test_failed_writes_map_by_tier_cause() -> Result<(), ValidationError> {
        let timed_out: ApiError = StorageError::SaveFailed {
            tier: TierId::FILE,
            source: ProviderError::Timeout {
                tier: TierId::FILE,
                after_ms: 20,
            },
        }
        .into();
        assert_eq!(timed_out.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let down: ApiError = StorageError::UpdateFailed {
            id: RecordId::parse("r1")?,
            tier: TierId::DATABASE,
            source: ProviderError::Unavailable {
                tier: TierId::DATABASE,
                reason: "pool closed".to_string(),
            },
        }
        .into();
        assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(down.details, Some(serde_json::json!({ "tier": "database" })));
        Ok(())
    }

    #[test]
    fn test_provider_errors_by_kind() {
        let timeout: ApiError = ProviderError::Timeout {
            tier: TierId::FILE,
            after_ms: 5,
        }
        .into();
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let unavailable: ApiError = ProviderError::Unavailable {
            tier: TierId::DATABASE,
            reason: "down".to_string(),
        }
        .into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let io: ApiError = ProviderError::Io {
            tier: TierId::FILE,
            reason: "disk".to_string(),
        }
        .into();
        assert_eq!(io.code, ErrorCode::StorageFailure);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::missing_field("value");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("MISSING_FIELD"));
        assert!(!json.contains("details"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::storage_failure("Disk full");
        let display = format!("{}", err);

        assert!(display.contains("StorageFailure"));
        assert!(display.contains("Disk full"));
    }
}
