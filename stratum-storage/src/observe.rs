//! Hook for watching every provider call the orchestrator makes.

use std::fmt;
use std::time::Duration;

use stratum_core::{ProviderError, TierId};

/// Why the orchestrator called a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Get,
    Save,
    Update,
    Delete,
    HealthCheck,
    /// Copying a read hit into a faster tier.
    Refresh,
    /// Compensating delete after a failed save.
    Rollback,
    /// Save into a tier that answered an update with no copy held.
    Reseed,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Get => "get",
            CallKind::Save => "save",
            CallKind::Update => "update",
            CallKind::Delete => "delete",
            CallKind::HealthCheck => "health_check",
            CallKind::Refresh => "refresh",
            CallKind::Rollback => "rollback",
            CallKind::Reseed => "reseed",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one event per provider call, timeouts included.
///
/// Called inline on the request path, so implementations must not block.
pub trait CallObserver: Send + Sync + fmt::Debug {
    fn on_call(
        &self,
        tier: &TierId,
        kind: CallKind,
        error: Option<&ProviderError>,
        elapsed: Duration,
    );
}
