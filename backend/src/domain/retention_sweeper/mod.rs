//! Recurring purge of tombstoned banners.
//!
//! Deletion requests only set the tombstone flag. This worker is the sole
//! path by which those rows become physically absent. A failed tick is
//! logged and retried at the next scheduled time; it never stops the loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::Error;
use crate::domain::banners::service_support::map_repository_error;
use crate::domain::ports::BannerRepository;

mod schedule;

pub use schedule::{DailySchedule, ScheduleParseError};

/// Async sleeping abstraction so tests can drive ticks by hand.
#[async_trait]
pub trait SweepSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSweepSleeper;

#[async_trait]
impl SweepSleeper for TokioSweepSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Background worker deleting tombstoned banners once a day.
pub struct RetentionSweeper {
    banner_repo: Arc<dyn BannerRepository>,
    schedule: DailySchedule,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn SweepSleeper>,
}

impl RetentionSweeper {
    /// Build a sweeper using the Tokio timer.
    pub fn new(
        banner_repo: Arc<dyn BannerRepository>,
        schedule: DailySchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_sleeper(banner_repo, schedule, clock, Arc::new(TokioSweepSleeper))
    }

    /// Build a sweeper with an explicit sleeper.
    pub fn with_sleeper(
        banner_repo: Arc<dyn BannerRepository>,
        schedule: DailySchedule,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn SweepSleeper>,
    ) -> Self {
        Self {
            banner_repo,
            schedule,
            clock,
            sleeper,
        }
    }

    /// Daily UTC time at which the sweep runs.
    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// Purge every tombstoned banner now. Returns the number removed.
    ///
    /// Running with nothing to purge is a no-op returning zero.
    pub async fn sweep_once(&self) -> Result<u64, Error> {
        let purged = self
            .banner_repo
            .purge_tombstoned()
            .await
            .map_err(map_repository_error)?;
        info!(purged, "retention sweep completed");
        Ok(purged)
    }

    /// Sweep at every scheduled tick until `shutdown` turns true or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(schedule = %self.schedule, "retention sweeper started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let delay = self.schedule.delay_after(self.clock.utc());
            debug!(?delay, "retention sweeper waiting for next tick");

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                () = self.sleeper.sleep(delay) => {}
            }

            if *shutdown.borrow() {
                break;
            }
            if let Err(error) = self.sweep_once().await {
                warn!(%error, "retention sweep failed; retrying at next tick");
            }
        }
        info!("retention sweeper stopped");
    }
}

/// Ask a running sweeper to stop.
///
/// Returns false, and logs, when every receiver is already gone because the
/// sweeper exited on its own.
pub fn request_shutdown(shutdown: &watch::Sender<bool>) -> bool {
    match shutdown.send(true) {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, "retention sweeper had already stopped before shutdown");
            false
        }
    }
}
