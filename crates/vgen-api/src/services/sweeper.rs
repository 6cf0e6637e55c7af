//! Background sweep of videos stuck in `processing`.
//!
//! A record can stay `processing` if the process dies mid-generation. The
//! sweeper fails any record older than the stale threshold so the user sees
//! a terminal state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use vgen_store::{StoreError, VideoStore};

use crate::config::{ApiConfig, MIN_SWEEP_INTERVAL};
use crate::metrics;

/// Records examined per sweep.
const SWEEP_BATCH: usize = 100;

pub const STALE_REASON: &str = "generation did not complete";

/// Stale video sweeper service.
pub struct StaleVideoSweeper {
    store: Arc<dyn VideoStore>,
    stale_after: Duration,
    interval: Duration,
    enabled: bool,
}

impl StaleVideoSweeper {
    pub fn new(store: Arc<dyn VideoStore>, config: &ApiConfig) -> Self {
        if config.stale_video_after <= config.generation_timeout {
            warn!(
                stale_after_secs = config.stale_video_after.as_secs(),
                timeout_secs = config.generation_timeout.as_secs(),
                "Stale threshold does not exceed the generation timeout; in-flight videos may be swept"
            );
        }

        Self {
            store,
            stale_after: config.stale_video_after,
            interval: config.stale_sweep_interval.max(MIN_SWEEP_INTERVAL),
            enabled: config.stale_sweep_enabled,
        }
    }

    /// Run until the task is dropped. Spawn this.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Stale video sweep is disabled");
            return;
        }

        info!(interval = ?self.interval, stale_after = ?self.stale_after, "Starting stale video sweeper");

        let mut ticker = interval(self.interval);
        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!("Stale video sweep error: {:#}", e);
            }
        }
    }

    /// One sweep. Returns (stale found, recovered).
    pub async fn sweep_once(&self) -> anyhow::Result<(u32, u32)> {
        let stale_after = chrono::Duration::from_std(self.stale_after)?;
        let cutoff = Utc::now() - stale_after;
        let stale = self.store.list_stale_processing(cutoff, SWEEP_BATCH).await?;

        if stale.is_empty() {
            return Ok((0, 0));
        }

        let mut recovered = 0u32;
        for record in &stale {
            match self.store.mark_failed(&record.id, STALE_REASON.to_string()).await {
                Ok(_) => {
                    recovered += 1;
                    warn!(
                        video_id = %record.id,
                        user_id = %record.user_id,
                        created_at = %record.created_at,
                        "Marked stale video as failed"
                    );
                }
                Err(StoreError::Conflict(_)) | Err(StoreError::NotFound(_)) => {
                    debug!(video_id = %record.id, "Video finished before sweep, skipping");
                }
                Err(e) => {
                    error!(video_id = %record.id, error = %e, "Failed to mark stale video");
                }
            }
        }

        metrics::record_stale_recovered(u64::from(recovered));
        let found = u32::try_from(stale.len()).unwrap_or(u32::MAX);
        info!(found, recovered, "Stale video sweep complete");
        Ok((found, recovered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_models::{VideoRecord, VideoStatus, VideoUpdate};
    use vgen_store::MemoryVideoStore;

    fn config() -> ApiConfig {
        ApiConfig {
            stale_video_after: Duration::from_secs(900),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sweeps_only_old_processing_records() {
        let store = Arc::new(MemoryVideoStore::new());
        let old = Utc::now() - chrono::Duration::hours(1);

        let stale = VideoRecord::new_at("u1", "old", "promo", old);
        let fresh = VideoRecord::new("u1", "new", "promo");
        let mut done = VideoRecord::new_at("u1", "done", "promo", old);
        done.apply(VideoUpdate::Completed { url: "https://cdn/v.mp4".into() }, old)
            .unwrap();

        for r in [stale.clone(), fresh.clone(), done.clone()] {
            store.insert(r).await;
        }

        let sweeper = StaleVideoSweeper::new(store.clone(), &config());
        assert_eq!(sweeper.sweep_once().await.unwrap(), (1, 1));

        let swept = store.get(&stale.id).await.unwrap().unwrap();
        assert_eq!(swept.status, VideoStatus::Failed);
        assert_eq!(swept.error_message.as_deref(), Some(STALE_REASON));
        assert_eq!(store.get(&fresh.id).await.unwrap().unwrap().status, VideoStatus::Processing);
        assert_eq!(store.get(&done.id).await.unwrap().unwrap().status, VideoStatus::Completed);

        assert_eq!(sweeper.sweep_once().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_kill_the_sweeper() {
        let store = Arc::new(MemoryVideoStore::new());
        let config = ApiConfig {
            stale_sweep_interval: Duration::ZERO,
            ..config()
        };

        let sweeper = StaleVideoSweeper::new(store, &config);
        assert_eq!(sweeper.interval, MIN_SWEEP_INTERVAL);

        let handle = tokio::spawn(async move { sweeper.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }
}
