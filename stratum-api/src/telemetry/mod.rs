//! Stratum Telemetry
//!
//! Structured logging for the server via `tracing-subscriber` and
//! Prometheus metrics for every tier call.

pub mod metrics;
pub mod tracer;

pub use metrics::{metrics_handler, PrometheusObserver, StratumMetrics, METRICS};
pub use tracer::{init_tracer, LogFormat, TelemetryConfig};
