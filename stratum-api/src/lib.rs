//! Stratum API - HTTP Transport and Database Tier
//!
//! Exposes the tiered record store over REST (Axum) and provides the
//! PostgreSQL-backed `database` tier. Handlers call the orchestrator only;
//! they never talk to a tier directly.

pub mod config;
pub mod db;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod stack;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::ApiConfig;
pub use db::{DbConfig, PostgresProvider};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use stack::build_state;
pub use state::ApiState;
