use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::coordinator::SyncCoordinator;
use crate::config::SchedulerConfig;

/// Periodic refresh trigger.
///
/// Failures are logged and the schedule keeps going; the next tick simply
/// tries again.
pub struct Scheduler {
    coordinator: SyncCoordinator,
    interval: Duration,
    run_on_start: bool,
    clear_snapshot_after_refresh: bool,
}

impl Scheduler {
    pub fn new(coordinator: SyncCoordinator, interval: Duration) -> Self {
        Self {
            coordinator,
            interval: interval.max(Duration::from_millis(1)),
            run_on_start: false,
            clear_snapshot_after_refresh: false,
        }
    }

    pub fn from_config(coordinator: SyncCoordinator, config: &SchedulerConfig) -> Self {
        Self::new(coordinator, config.interval())
            .run_on_start(config.run_on_start)
            .clear_snapshot_after_refresh(config.clear_snapshot_after_refresh)
    }

    #[must_use]
    pub fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    #[must_use]
    pub fn clear_snapshot_after_refresh(mut self, enabled: bool) -> Self {
        self.clear_snapshot_after_refresh = enabled;
        self
    }

    /// Trigger refreshes until `shutdown` resolves.
    ///
    /// Returns the number of cycles that succeeded.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.run_on_start {
            // The first tick completes immediately
            ticker.tick().await;
        }

        info!("Scheduler started with interval {:?}", self.interval);
        tokio::pin!(shutdown);
        let mut succeeded = 0;

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if self.trigger().await {
                        succeeded += 1;
                    }
                }
            }
        }

        info!("Scheduler stopped after {succeeded} successful refreshes");
        succeeded
    }

    /// Run one scheduled refresh; returns whether it succeeded
    pub async fn trigger(&self) -> bool {
        info!("Scheduled refresh triggered at {}", Utc::now());
        let succeeded = match self.coordinator.refresh().await {
            Ok(index) => {
                info!("Scheduled refresh completed successfully ({} names)", index.len());
                true
            }
            Err(err) => {
                error!("Scheduled refresh failed: {err}");
                false
            }
        };

        if self.clear_snapshot_after_refresh {
            self.coordinator.clear_snapshot();
        }
        succeeded
    }
}
