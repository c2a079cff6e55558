//! Dispatch metrics and tracing setup

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

/// Counters recorded by a composite while executing requests.
///
/// Only `execute` records: a bare `can_handle` (as issued by an enclosing
/// composite) leaves them untouched, so a nested request counts once per
/// level that executes it.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    resolutions: AtomicU64,
    dispatched: AtomicU64,
    unmatched: AtomicU64,
    probes: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_started(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probed(&self, count: u64) {
        self.probes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "dispatched", "Metric incremented");
    }

    pub fn unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "unmatched", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub resolutions: u64,
    pub dispatched: u64,
    pub unmatched: u64,
    pub probes: u64,
}

/// Handle for replacing the log filter once configuration is known
pub struct TracingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl TracingHandle {
    /// Switch to `filter` unless `RUST_LOG` already chose one
    pub fn apply_filter(&self, filter: &str) {
        if self.from_env {
            return;
        }
        if let Err(e) = self.filter.reload(EnvFilter::new(filter)) {
            tracing::debug!(error = %e, "Log filter not reloaded");
        }
    }
}

/// Install the global fmt subscriber with a reloadable filter.
///
/// Call before loading configuration so load-time events are kept; then
/// hand the configured filter to [`TracingHandle::apply_filter`].
/// `RUST_LOG` wins over both when set.
pub fn init_tracing(default_filter: &str) -> TracingHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_filter), false),
    };
    let (filter_layer, handle) = reload::Layer::new(filter);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();

    TracingHandle {
        filter: handle,
        from_env,
    }
}
