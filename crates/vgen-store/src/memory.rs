//! In-memory record store and plan resolver.
//!
//! Used for local development and tests. All mutations run under a single
//! write lock, so quota checks and per-record transitions are serialized.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use vgen_models::{MonthWindow, PlanTier, QuotaPolicy, VideoId, VideoRecord, VideoStatus, VideoUpdate};

use crate::error::{BillingError, StoreError, StoreResult};
use crate::store::{PageRequest, PlanResolver, VideoFilter, VideoPage, VideoStats, VideoStore};

/// Record store backed by a process-local map.
#[derive(Default)]
pub struct MemoryVideoStore {
    records: RwLock<HashMap<VideoId, VideoRecord>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing quota. Test and seeding helper.
    pub async fn insert(&self, record: VideoRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn count_in(records: &HashMap<VideoId, VideoRecord>, user_id: &str, window: MonthWindow) -> u32 {
        let count = records
            .values()
            .filter(|r| r.user_id == user_id && window.contains(r.created_at))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn create_within_quota(
        &self,
        record: VideoRecord,
        tier: PlanTier,
        policy: &QuotaPolicy,
        window: MonthWindow,
    ) -> StoreResult<VideoRecord> {
        let mut records = self.records.write().await;

        let used = Self::count_in(&records, &record.user_id, window);
        if !policy.is_allowed(tier, used) {
            let limit = policy.monthly_limit(tier).unwrap_or(used);
            return Err(StoreError::QuotaExceeded { limit });
        }

        if records.contains_key(&record.id) {
            return Err(StoreError::conflict(format!("video {} already exists", record.id)));
        }

        debug!(video_id = %record.id, user_id = %record.user_id, used, "Created video record");
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn finalize(&self, id: &VideoId, update: VideoUpdate) -> StoreResult<VideoRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        record
            .apply(update, Utc::now())
            .map_err(|e| StoreError::conflict(format!("video {}: {}", id, e)))?;

        Ok(record.clone())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        filter: VideoFilter,
        page: PageRequest,
    ) -> StoreResult<VideoPage> {
        let records = self.records.read().await;
        let mut matching: Vec<&VideoRecord> = records
            .values()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let records = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(VideoPage { records, total })
    }

    async fn count_created_in(&self, user_id: &str, window: MonthWindow) -> StoreResult<u32> {
        let records = self.records.read().await;
        Ok(Self::count_in(&records, user_id, window))
    }

    async fn stats(&self, user_id: &str, window: MonthWindow) -> StoreResult<VideoStats> {
        let records = self.records.read().await;
        let mut stats = VideoStats::default();

        for record in records.values().filter(|r| r.user_id == user_id) {
            stats.total_videos += 1;
            if window.contains(record.created_at) {
                stats.videos_this_month += 1;
            }
            match record.status {
                VideoStatus::Completed => stats.completed_videos += 1,
                VideoStatus::Processing => stats.processing_videos += 1,
                VideoStatus::Failed => stats.failed_videos += 1,
            }
        }

        Ok(stats)
    }

    async fn list_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<VideoRecord>> {
        let records = self.records.read().await;
        let mut stale: Vec<VideoRecord> = records
            .values()
            .filter(|r| r.status == VideoStatus::Processing && r.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        stale.truncate(limit);
        Ok(stale)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Plan lookup backed by a map, with an optional tier for unknown users.
pub struct MemoryPlanResolver {
    plans: RwLock<HashMap<String, PlanTier>>,
    default_tier: Option<PlanTier>,
}

impl MemoryPlanResolver {
    /// Unknown users resolve to `NotFound`.
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
            default_tier: None,
        }
    }

    /// Unknown users resolve to `tier`.
    pub fn with_default(tier: PlanTier) -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
            default_tier: Some(tier),
        }
    }

    pub async fn set_plan(&self, user_id: impl Into<String>, tier: PlanTier) {
        self.plans.write().await.insert(user_id.into(), tier);
    }
}

impl Default for MemoryPlanResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanResolver for MemoryPlanResolver {
    async fn resolve_plan(&self, user_id: &str) -> Result<PlanTier, BillingError> {
        if let Some(tier) = self.plans.read().await.get(user_id) {
            return Ok(*tier);
        }
        self.default_tier
            .ok_or_else(|| BillingError::NotFound(user_id.to_string()))
    }
}
