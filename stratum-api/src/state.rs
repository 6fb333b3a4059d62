//! Shared application state for Axum routers.

use std::sync::Arc;

use stratum_storage::{MemoryCacheProvider, Orchestrator};

/// Everything the routers need from the assembled tier stack.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub orchestrator: Orchestrator,
    /// Cache tier whose hit/miss counters feed the metrics gauges.
    /// `None` when the cache tier is not a [`MemoryCacheProvider`].
    pub cache: Option<Arc<MemoryCacheProvider>>,
}

impl ApiState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<MemoryCacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }
}
