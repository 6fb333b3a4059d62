//! Prometheus Metrics Definitions
//!
//! Per-tier provider call counters and latencies, fed by [`PrometheusObserver`],
//! plus cache gauges refreshed from [`CacheStats`] on every scrape.
//! Exposes a /metrics endpoint for Prometheus scraping.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, TextEncoder,
};
use stratum_core::{ProviderError, TierId};
use stratum_storage::{CacheStats, CallKind, CallObserver};

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

/// Provider call latency buckets (seconds)
/// Covers: 0.1ms through 5s; cache hits land in the first buckets.
const CALL_LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0,
];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<StratumMetrics>> = Lazy::new(StratumMetrics::new);

/// Container for all Stratum metrics.
#[derive(Clone)]
pub struct StratumMetrics {
    /// Provider call counter - labels: tier, operation, status
    pub provider_calls_total: CounterVec,

    /// Provider call duration histogram - labels: tier, operation
    pub provider_call_duration_seconds: HistogramVec,

    /// Cache lookups since start - labels: result (hit/miss)
    pub cache_lookups: GaugeVec,

    /// Entries currently held by the cache tier
    pub cache_entries: Gauge,

    /// Capacity evictions since start
    pub cache_evictions: Gauge,

    /// TTL expirations since start
    pub cache_expirations: Gauge,

    /// hits / (hits + misses)
    pub cache_hit_ratio: Gauge,
}

impl StratumMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            provider_calls_total: register_counter_vec!(
                "stratum_provider_calls_total",
                "Total number of storage provider calls",
                &["tier", "operation", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register provider_calls_total: {}", e)))?,

            provider_call_duration_seconds: register_histogram_vec!(
                "stratum_provider_call_duration_seconds",
                "Storage provider call duration in seconds",
                &["tier", "operation"],
                CALL_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register provider_call_duration_seconds: {}", e)))?,

            cache_lookups: register_gauge_vec!(
                "stratum_cache_lookups",
                "Cache tier lookups since start",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups: {}", e)))?,

            cache_entries: register_gauge!(
                "stratum_cache_entries",
                "Current number of entries in the cache tier"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_entries: {}", e)))?,

            cache_evictions: register_gauge!(
                "stratum_cache_evictions",
                "Cache entries evicted for capacity since start"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_evictions: {}", e)))?,

            cache_expirations: register_gauge!(
                "stratum_cache_expirations",
                "Cache entries dropped on TTL since start"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_expirations: {}", e)))?,

            cache_hit_ratio: register_gauge!(
                "stratum_cache_hit_ratio",
                "Cache tier hit ratio (0.0 to 1.0)"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_hit_ratio: {}", e)))?,
        })
    }

    /// Record one provider call.
    pub fn record_provider_call(
        &self,
        tier: &str,
        operation: &str,
        success: bool,
        duration_secs: f64,
    ) {
        let status = if success { "success" } else { "error" };
        self.provider_calls_total
            .with_label_values(&[tier, operation, status])
            .inc();
        self.provider_call_duration_seconds
            .with_label_values(&[tier, operation])
            .observe(duration_secs);
    }

    /// Copy a cache snapshot into the gauges.
    pub fn observe_cache(&self, stats: &CacheStats) {
        self.cache_lookups
            .with_label_values(&["hit"])
            .set(stats.hits as f64);
        self.cache_lookups
            .with_label_values(&["miss"])
            .set(stats.misses as f64);
        self.cache_entries.set(stats.entry_count as f64);
        self.cache_evictions.set(stats.evictions as f64);
        self.cache_expirations.set(stats.expirations as f64);
        self.cache_hit_ratio.set(stats.hit_rate());
    }
}

/// Feeds every orchestrator provider call into [`METRICS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusObserver;

impl CallObserver for PrometheusObserver {
    fn on_call(
        &self,
        tier: &TierId,
        kind: CallKind,
        error: Option<&ProviderError>,
        elapsed: Duration,
    ) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_provider_call(
                tier.as_str(),
                kind.as_str(),
                error.is_none(),
                elapsed.as_secs_f64(),
            );
        }
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match METRICS.as_ref() {
        Ok(metrics) => {
            if let Some(cache) = &state.cache {
                metrics.observe_cache(&cache.stats());
            }
        }
        Err(e) => tracing::error!(error = %e, "Metrics unavailable"),
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
