//! Record store and billing contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vgen_models::{MonthWindow, PlanTier, QuotaPolicy, VideoId, VideoRecord, VideoStatus, VideoUpdate};

use crate::error::{BillingError, StoreResult};

/// Default page size for video listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Optional status filter for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoFilter {
    pub status: Option<VideoStatus>,
}

impl VideoFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: VideoStatus) -> Self {
        Self { status: Some(status) }
    }

    pub fn matches(&self, record: &VideoRecord) -> bool {
        self.status.map(|s| s == record.status).unwrap_or(true)
    }
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp into a valid page (page >= 1, 1 <= limit <= MAX_PAGE_SIZE).
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of records plus the total matching count.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPage {
    pub records: Vec<VideoRecord>,
    pub total: u64,
}

impl VideoPage {
    /// Number of pages at the given page size.
    pub fn pages(&self, limit: u32) -> u64 {
        let limit = u64::from(limit.max(1));
        self.total.div_ceil(limit)
    }
}

/// Per-user counters for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStats {
    pub total_videos: u64,
    pub videos_this_month: u64,
    pub completed_videos: u64,
    pub processing_videos: u64,
    pub failed_videos: u64,
}

/// Persistent store of video records.
///
/// Implementations serialize updates per record and make
/// [`VideoStore::create_within_quota`] atomic per user.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Count the user's videos in `window` and create `record` only if
    /// `policy` still allows another one. Fails with
    /// `StoreError::QuotaExceeded` without creating anything otherwise.
    async fn create_within_quota(
        &self,
        record: VideoRecord,
        tier: PlanTier,
        policy: &QuotaPolicy,
        window: MonthWindow,
    ) -> StoreResult<VideoRecord>;

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>>;

    /// Move a processing record to a terminal state.
    ///
    /// Returns `NotFound` for unknown ids and `Conflict` when the record has
    /// already left `processing`.
    async fn finalize(&self, id: &VideoId, update: VideoUpdate) -> StoreResult<VideoRecord>;

    /// The user's records, newest first.
    async fn list_by_user(
        &self,
        user_id: &str,
        filter: VideoFilter,
        page: PageRequest,
    ) -> StoreResult<VideoPage>;

    async fn count_created_in(&self, user_id: &str, window: MonthWindow) -> StoreResult<u32>;

    async fn stats(&self, user_id: &str, window: MonthWindow) -> StoreResult<VideoStats>;

    /// Records still `processing` that were created before `cutoff`, oldest first.
    async fn list_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<VideoRecord>>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> StoreResult<()>;

    async fn mark_completed(&self, id: &VideoId, url: String) -> StoreResult<VideoRecord> {
        self.finalize(id, VideoUpdate::Completed { url }).await
    }

    async fn mark_failed(&self, id: &VideoId, reason: String) -> StoreResult<VideoRecord> {
        self.finalize(id, VideoUpdate::Failed { reason }).await
    }
}

/// Source of a user's subscription tier.
#[async_trait]
pub trait PlanResolver: Send + Sync {
    async fn resolve_plan(&self, user_id: &str) -> Result<PlanTier, BillingError>;
}
