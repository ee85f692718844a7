// Background refresh loop
use crate::application::dashboard_service::{DashboardService, RefreshOutcome, RefreshTrigger};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Periodically asks the dashboard service for a background refresh.
/// Whether a tick actually fetches is decided by the service.
pub struct RefreshPoller {
    service: DashboardService,
    interval: Duration,
}

impl RefreshPoller {
    pub fn new(service: DashboardService, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub fn start(self) -> PollerHandle {
        let handle = tokio::spawn(async move {
            self.poll_loop().await;
        });
        PollerHandle { handle }
    }

    async fn poll_loop(self) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick fires immediately; startup load is done separately
        interval.tick().await;

        loop {
            interval.tick().await;
            match self.service.refresh(RefreshTrigger::Background).await {
                Ok(RefreshOutcome::Loaded { records }) => {
                    tracing::debug!(records, "background refresh loaded data");
                }
                Ok(outcome) => tracing::trace!(?outcome, "background tick"),
                Err(e) => tracing::debug!(error = %e, "background refresh failed"),
            }
        }
    }
}

/// Handle to the spawned loop; call [`PollerHandle::abort`] to stop it.
pub struct PollerHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
