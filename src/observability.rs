use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Traveler service counters
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    pub commits: AtomicU64,
    pub version_conflicts: AtomicU64,
    pub approvals_requested: AtomicU64,
    pub approvals_resolved: AtomicU64,
    pub timers_started: AtomicU64,
    pub timers_stopped: AtomicU64,
    pub validation_failures: AtomicU64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_version_conflict(&self) {
        self.version_conflicts.fetch_add(1, Ordering::Relaxed);
        warn!("Traveler commit rejected: stale version");
    }

    pub fn record_approval_requested(&self) {
        self.approvals_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_approval_resolved(&self) {
        self.approvals_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timer_started(&self) {
        self.timers_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timer_stopped(&self) {
        self.timers_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ServiceStats {
        ServiceStats {
            commits: self.commits.load(Ordering::Relaxed),
            version_conflicts: self.version_conflicts.load(Ordering::Relaxed),
            approvals_requested: self.approvals_requested.load(Ordering::Relaxed),
            approvals_resolved: self.approvals_resolved.load(Ordering::Relaxed),
            timers_started: self.timers_started.load(Ordering::Relaxed),
            timers_stopped: self.timers_stopped.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Service metrics: commits={}, conflicts={}, approvals_requested={}, approvals_resolved={}, timers_started={}, timers_stopped={}, validation_failures={}",
            stats.commits,
            stats.version_conflicts,
            stats.approvals_requested,
            stats.approvals_resolved,
            stats.timers_started,
            stats.timers_stopped,
            stats.validation_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub commits: u64,
    pub version_conflicts: u64,
    pub approvals_requested: u64,
    pub approvals_resolved: u64,
    pub timers_started: u64,
    pub timers_stopped: u64,
    pub validation_failures: u64,
}

/// Global metrics instance
static SERVICE_METRICS: std::sync::LazyLock<ServiceMetrics> =
    std::sync::LazyLock::new(ServiceMetrics::new);

pub fn service_metrics() -> &'static ServiceMetrics {
    &SERVICE_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ServiceMetrics::new();
        metrics.record_commit();
        metrics.record_commit();
        metrics.record_version_conflict();
        metrics.record_timer_started();

        let stats = metrics.get_stats();
        assert_eq!(stats.commits, 2);
        assert_eq!(stats.version_conflicts, 1);
        assert_eq!(stats.timers_started, 1);
        assert_eq!(stats.timers_stopped, 0);
    }
}
