//! Firestore-backed [`VideoStore`].
//!
//! Layout:
//! - `videos/{video_id}`: one document per record, with a `user_id` field
//! - `users/{uid}`: account document; `quota_reserved_at` is rewritten on
//!   every quota-limited create
//!
//! Quota-limited creates count the user's videos, then commit the user
//! document (guarded by the update time read before counting) together with
//! the new video (guarded by `exists=false`). A concurrent create changes the
//! user document's update time, so the loser's commit fails its precondition
//! and it recounts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use vgen_models::{MonthWindow, PlanTier, QuotaPolicy, VideoId, VideoRecord, VideoStatus, VideoUpdate};

use super::client::FirestoreClient;
use super::error::FirestoreError;
use super::metrics::record_quota_contention;
use super::types::{Document, FieldFilter, Precondition, StructuredQuery, ToFirestoreValue, Value, Write};
use crate::error::{StoreError, StoreResult};
use crate::store::{PageRequest, VideoFilter, VideoPage, VideoStats, VideoStore};

pub const VIDEOS_COLLECTION: &str = "videos";
pub const USERS_COLLECTION: &str = "users";

/// Attempts before a contended quota reservation gives up.
const MAX_QUOTA_ATTEMPTS: u32 = 5;

/// Attempts before a contended finalize gives up.
const MAX_FINALIZE_ATTEMPTS: u32 = 3;

const QUOTA_RESERVED_AT: &str = "quota_reserved_at";

/// Fields written when a record reaches a terminal state.
const FINALIZE_MASK: &[&str] = &[
    "status",
    "url",
    "error_message",
    "updated_at",
    "completed_at",
    "failed_at",
];

/// Record store backed by Firestore.
#[derive(Clone)]
pub struct FirestoreVideoStore {
    client: FirestoreClient,
}

impl FirestoreVideoStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn to_fields(record: &VideoRecord) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("user_id".to_string(), record.user_id.to_firestore_value());
        fields.insert("title".to_string(), record.title.to_firestore_value());
        fields.insert("preset_id".to_string(), record.preset_id.to_firestore_value());
        fields.insert("url".to_string(), record.url.to_firestore_value());
        fields.insert("status".to_string(), record.status.as_str().to_firestore_value());
        fields.insert("error_message".to_string(), record.error_message.to_firestore_value());
        fields.insert("created_at".to_string(), record.created_at.to_firestore_value());
        fields.insert("updated_at".to_string(), record.updated_at.to_firestore_value());
        fields.insert("completed_at".to_string(), record.completed_at.to_firestore_value());
        fields.insert("failed_at".to_string(), record.failed_at.to_firestore_value());
        fields
    }

    fn from_document(doc: &Document) -> StoreResult<VideoRecord> {
        let id = doc
            .id()
            .ok_or_else(|| StoreError::corrupt("<unnamed>", "document has no name"))?
            .to_string();

        let required = |key: &str| -> StoreResult<String> {
            doc.get::<String>(key)
                .ok_or_else(|| StoreError::corrupt(&id, format!("missing field {}", key)))
        };
        let timestamp = |key: &str| -> StoreResult<DateTime<Utc>> {
            doc.get::<DateTime<Utc>>(key)
                .ok_or_else(|| StoreError::corrupt(&id, format!("missing timestamp {}", key)))
        };

        let status_str = required("status")?;
        let status = VideoStatus::parse(&status_str)
            .ok_or_else(|| StoreError::corrupt(&id, format!("unknown status {}", status_str)))?;

        Ok(VideoRecord {
            id: VideoId::from_string(id.clone()),
            user_id: required("user_id")?,
            title: doc.get::<String>("title").unwrap_or_default(),
            preset_id: required("preset_id")?,
            url: doc.get::<String>("url").unwrap_or_default(),
            status,
            error_message: doc.get::<String>("error_message"),
            created_at: timestamp("created_at")?,
            updated_at: timestamp("updated_at")?,
            completed_at: doc.get::<DateTime<Utc>>("completed_at"),
            failed_at: doc.get::<DateTime<Utc>>("failed_at"),
        })
    }

    fn user_filters(user_id: &str, filter: VideoFilter) -> Vec<FieldFilter> {
        let mut filters = vec![FieldFilter::eq("user_id", user_id.to_firestore_value())];
        if let Some(status) = filter.status {
            filters.push(FieldFilter::eq("status", status.as_str().to_firestore_value()));
        }
        filters
    }

    fn window_filters(user_id: &str, window: MonthWindow) -> Vec<FieldFilter> {
        vec![
            FieldFilter::eq("user_id", user_id.to_firestore_value()),
            FieldFilter::gte("created_at", window.start.to_firestore_value()),
            FieldFilter::lt("created_at", window.end.to_firestore_value()),
        ]
    }

    async fn count(&self, filters: Vec<FieldFilter>) -> StoreResult<u64> {
        let query = StructuredQuery::collection(VIDEOS_COLLECTION).filter_all(filters);
        Ok(self.client.count(query).await?)
    }

    fn reservation_write(&self, user_id: &str, update_time: Option<String>) -> Write {
        let mut fields = HashMap::new();
        fields.insert(QUOTA_RESERVED_AT.to_string(), Utc::now().to_firestore_value());
        let doc = Document::named(self.client.full_document_name(USERS_COLLECTION, user_id), fields);
        let precondition = match update_time {
            Some(ts) => Precondition::updated_at(ts),
            None => Precondition::must_not_exist(),
        };
        Write::patch(doc, vec![QUOTA_RESERVED_AT.to_string()], precondition)
    }

    fn create_write(&self, record: &VideoRecord) -> Write {
        Write::create(Document::named(
            self.client.full_document_name(VIDEOS_COLLECTION, record.id.as_str()),
            Self::to_fields(record),
        ))
    }
}

#[async_trait]
impl VideoStore for FirestoreVideoStore {
    async fn create_within_quota(
        &self,
        record: VideoRecord,
        tier: PlanTier,
        policy: &QuotaPolicy,
        window: MonthWindow,
    ) -> StoreResult<VideoRecord> {
        if policy.monthly_limit(tier).is_none() {
            self.client
                .create_document(VIDEOS_COLLECTION, record.id.as_str(), Self::to_fields(&record))
                .await?;
            return Ok(record);
        }

        for attempt in 1..=MAX_QUOTA_ATTEMPTS {
            let user_doc = self.client.get_document(USERS_COLLECTION, &record.user_id).await?;
            let update_time = user_doc.and_then(|d| d.update_time);

            let used = self.count_created_in(&record.user_id, window).await?;
            if !policy.is_allowed(tier, used) {
                let limit = policy.monthly_limit(tier).unwrap_or(used);
                return Err(StoreError::QuotaExceeded { limit });
            }

            let writes = vec![
                self.reservation_write(&record.user_id, update_time),
                self.create_write(&record),
            ];

            match self.client.commit(writes).await {
                Ok(_) => {
                    debug!(video_id = %record.id, user_id = %record.user_id, used, "Created video record");
                    return Ok(record);
                }
                Err(e) if e.is_precondition_failed() || matches!(e, FirestoreError::AlreadyExists(_)) => {
                    record_quota_contention();
                    warn!(
                        user_id = %record.user_id,
                        attempt,
                        "Quota reservation contended, recounting"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::conflict(format!(
            "quota reservation for user {} kept conflicting",
            record.user_id
        )))
    }

    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        match self.client.get_document(VIDEOS_COLLECTION, id.as_str()).await? {
            Some(doc) => Ok(Some(Self::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn finalize(&self, id: &VideoId, update: VideoUpdate) -> StoreResult<VideoRecord> {
        for attempt in 1..=MAX_FINALIZE_ATTEMPTS {
            let doc = self
                .client
                .get_document(VIDEOS_COLLECTION, id.as_str())
                .await?
                .ok_or_else(|| StoreError::not_found(id.as_str()))?;
            let update_time = doc.update_time.clone();
            let mut record = Self::from_document(&doc)?;

            record
                .apply(update.clone(), Utc::now())
                .map_err(|e| StoreError::conflict(format!("video {}: {}", id, e)))?;

            let fields = Self::to_fields(&record);
            match self
                .client
                .patch_document(VIDEOS_COLLECTION, id.as_str(), fields, FINALIZE_MASK, update_time.as_deref())
                .await
            {
                Ok(_) => return Ok(record),
                Err(e) if e.is_precondition_failed() => {
                    warn!(video_id = %id, attempt, "Video changed during finalize, re-reading");
                }
                Err(FirestoreError::NotFound(_)) => return Err(StoreError::not_found(id.as_str())),
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::conflict(format!("video {} kept changing during finalize", id)))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        filter: VideoFilter,
        page: PageRequest,
    ) -> StoreResult<VideoPage> {
        let query = StructuredQuery::collection(VIDEOS_COLLECTION)
            .filter_all(Self::user_filters(user_id, filter))
            .order_by("created_at", true)
            .offset(page.offset())
            .limit(page.limit);

        let (docs, total) = tokio::try_join!(
            async { Ok::<_, StoreError>(self.client.run_query(query).await?) },
            self.count(Self::user_filters(user_id, filter)),
        )?;

        let records = docs
            .iter()
            .map(Self::from_document)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(VideoPage { records, total })
    }

    async fn count_created_in(&self, user_id: &str, window: MonthWindow) -> StoreResult<u32> {
        let count = self.count(Self::window_filters(user_id, window)).await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn stats(&self, user_id: &str, window: MonthWindow) -> StoreResult<VideoStats> {
        let (total_videos, videos_this_month, completed_videos, processing_videos, failed_videos) = tokio::try_join!(
            self.count(Self::user_filters(user_id, VideoFilter::all())),
            self.count(Self::window_filters(user_id, window)),
            self.count(Self::user_filters(user_id, VideoFilter::with_status(VideoStatus::Completed))),
            self.count(Self::user_filters(user_id, VideoFilter::with_status(VideoStatus::Processing))),
            self.count(Self::user_filters(user_id, VideoFilter::with_status(VideoStatus::Failed))),
        )?;

        Ok(VideoStats {
            total_videos,
            videos_this_month,
            completed_videos,
            processing_videos,
            failed_videos,
        })
    }

    async fn list_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<VideoRecord>> {
        let query = StructuredQuery::collection(VIDEOS_COLLECTION)
            .filter_all(vec![
                FieldFilter::eq("status", VideoStatus::Processing.as_str().to_firestore_value()),
                FieldFilter::lt("created_at", cutoff.to_firestore_value()),
            ])
            .order_by("created_at", false)
            .limit(u32::try_from(limit).unwrap_or(u32::MAX));

        self.client
            .run_query(query)
            .await?
            .iter()
            .map(Self::from_document)
            .collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client.get_document("_health", "_check").await?;
        Ok(())
    }
}
