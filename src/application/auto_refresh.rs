// Auto refresh - Periodic timer ticks into the dashboard controller
use crate::application::dashboard_controller::{CycleOutcome, DashboardController};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the refresh task of one dashboard session. Dropping the handle stops
/// the timer.
pub struct AutoRefreshHandle {
    task: Option<JoinHandle<()>>,
}

impl AutoRefreshHandle {
    /// Start ticking `controller` every `period`, first tick one period from now.
    pub fn spawn(controller: Arc<DashboardController>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = IntervalStream::new(interval);

            while ticks.next().await.is_some() {
                match controller.tick().await {
                    CycleOutcome::Skipped => {}
                    CycleOutcome::PageFailed(e) => {
                        tracing::warn!("Auto refresh failed: {}", e);
                    }
                    outcome => tracing::debug!("Auto refresh: {:?}", outcome),
                }
            }
        });

        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Auto refresh stopped");
        }
    }
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
