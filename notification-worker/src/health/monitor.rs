//! Startup gate on the search cluster.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info};

use super::backoff::Backoff;
use super::search::{ClusterHealthProbe, HealthStatus};

/// Polls a cluster until it answers, then stops.
///
/// `Polling → Healthy` is the only exit. Failures loop back to `Polling`
/// after a backoff delay; there is no give-up state.
pub struct DependencyHealthMonitor {
    probe: Arc<dyn ClusterHealthProbe>,
    backoff: Backoff,
}

impl DependencyHealthMonitor {
    pub fn new(probe: Arc<dyn ClusterHealthProbe>, backoff: Backoff) -> Self {
        Self { probe, backoff }
    }

    /// Block until one probe succeeds and return the reported status.
    pub async fn check_connection(&self) -> HealthStatus {
        let mut backoff = self.backoff.clone();
        let mut failures: u32 = 0;

        loop {
            match self.probe.cluster_health().await {
                Ok(status) => {
                    info!(
                        status = %status,
                        failed_attempts = failures,
                        "elasticsearch_health_status"
                    );
                    return status;
                }
                Err(e) => {
                    failures += 1;
                    let delay = backoff.next().unwrap_or_default();
                    error!(
                        error = %e,
                        attempt = failures,
                        retry_in_ms = delay.as_millis() as u64,
                        "elasticsearch_connection_failed"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::ProbeError;

    /// Fails a fixed number of times, then reports `status`.
    struct ScriptedProbe {
        failures: usize,
        status: HealthStatus,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(failures: usize, status: HealthStatus) -> Self {
            Self {
                failures,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ClusterHealthProbe for ScriptedProbe {
        async fn cluster_health(&self) -> Result<HealthStatus, ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ProbeError::Unavailable("connection refused".to_string()))
            } else {
                Ok(self.status)
            }
        }
    }

    fn fast_backoff() -> Backoff {
        Backoff::new(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds() {
        let probe = Arc::new(ScriptedProbe::new(2, HealthStatus::Green));
        let monitor = DependencyHealthMonitor::new(probe.clone(), fast_backoff());

        let status = monitor.check_connection().await;

        assert_eq!(status, HealthStatus::Green);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_healthy_on_first_poll() {
        let probe = Arc::new(ScriptedProbe::new(0, HealthStatus::Yellow));
        let monitor = DependencyHealthMonitor::new(probe.clone(), fast_backoff());

        assert_eq!(monitor.check_connection().await, HealthStatus::Yellow);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_red_cluster_still_ends_polling() {
        let probe = Arc::new(ScriptedProbe::new(0, HealthStatus::Red));
        let monitor = DependencyHealthMonitor::new(probe.clone(), fast_backoff());

        assert_eq!(monitor.check_connection().await, HealthStatus::Red);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_polling_a_long_outage() {
        let probe = Arc::new(ScriptedProbe::new(50, HealthStatus::Green));
        let monitor = DependencyHealthMonitor::new(probe.clone(), Backoff::default());

        assert_eq!(monitor.check_connection().await, HealthStatus::Green);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 51);
    }
}
