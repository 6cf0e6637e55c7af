//! Video records and their lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a generated video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generation status of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Record created, provider call in flight
    #[default]
    Processing,
    /// Provider returned a video URL
    Completed,
    /// Provider call failed or timed out
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Parse a stored status. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(VideoStatus::Processing),
            "completed" => Some(VideoStatus::Completed),
            "failed" => Some(VideoStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }

    /// Only `processing` may move, and only to a terminal state.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        matches!(
            (self, next),
            (VideoStatus::Processing, VideoStatus::Completed)
                | (VideoStatus::Processing, VideoStatus::Failed)
        )
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal update applied to a processing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoUpdate {
    Completed { url: String },
    Failed { reason: String },
}

impl VideoUpdate {
    pub fn target_status(&self) -> VideoStatus {
        match self {
            VideoUpdate::Completed { .. } => VideoStatus::Completed,
            VideoUpdate::Failed { .. } => VideoStatus::Failed,
        }
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("video is already {0}")]
    AlreadyTerminal(VideoStatus),

    #[error("completed video requires a non-empty url")]
    MissingUrl,
}

/// Persistent record of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    pub id: VideoId,
    pub user_id: String,
    pub title: String,
    pub preset_id: String,
    /// Empty until the video completes.
    pub url: String,
    pub status: VideoStatus,
    /// Provider diagnostics. Never returned to clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

impl VideoRecord {
    /// New record in `processing` with a fresh id.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, preset_id: impl Into<String>) -> Self {
        Self::new_at(user_id, title, preset_id, Utc::now())
    }

    pub fn new_at(
        user_id: impl Into<String>,
        title: impl Into<String>,
        preset_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VideoId::new(),
            user_id: user_id.into(),
            title: title.into(),
            preset_id: preset_id.into(),
            url: String::new(),
            status: VideoStatus::Processing,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
        }
    }

    /// Apply a terminal update. Fails if the record already left `processing`.
    pub fn apply(&mut self, update: VideoUpdate, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(update.target_status()) {
            return Err(TransitionError::AlreadyTerminal(self.status));
        }

        match update {
            VideoUpdate::Completed { url } => {
                if url.trim().is_empty() {
                    return Err(TransitionError::MissingUrl);
                }
                self.status = VideoStatus::Completed;
                self.url = url;
                self.completed_at = Some(now);
            }
            VideoUpdate::Failed { reason } => {
                self.status = VideoStatus::Failed;
                self.error_message = Some(reason);
                self.failed_at = Some(now);
            }
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Client-facing view of a video record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub preset: String,
    pub url: String,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&VideoRecord> for VideoSummary {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            preset: record.preset_id.clone(),
            url: record.url.clone(),
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_processing() {
        let record = VideoRecord::new("user-1", "Acme", "promo");
        assert_eq!(record.status, VideoStatus::Processing);
        assert!(record.url.is_empty());
        assert!(Uuid::parse_str(record.id.as_str()).is_ok());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_complete_sets_url() {
        let mut record = VideoRecord::new("user-1", "Acme", "promo");
        let now = Utc::now();
        record
            .apply(VideoUpdate::Completed { url: "https://cdn/v.mp4".into() }, now)
            .unwrap();
        assert_eq!(record.status, VideoStatus::Completed);
        assert_eq!(record.url, "https://cdn/v.mp4");
        assert_eq!(record.completed_at, Some(now));
    }

    #[test]
    fn test_fail_keeps_reason() {
        let mut record = VideoRecord::new("user-1", "Acme", "promo");
        record
            .apply(VideoUpdate::Failed { reason: "nsfw".into() }, Utc::now())
            .unwrap();
        assert_eq!(record.status, VideoStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("nsfw"));
        assert!(record.url.is_empty());
    }

    #[test]
    fn test_terminal_records_reject_updates() {
        let mut record = VideoRecord::new("user-1", "Acme", "promo");
        record
            .apply(VideoUpdate::Failed { reason: "x".into() }, Utc::now())
            .unwrap();
        let err = record
            .apply(VideoUpdate::Completed { url: "https://cdn/v.mp4".into() }, Utc::now())
            .unwrap_err();
        assert_eq!(err, TransitionError::AlreadyTerminal(VideoStatus::Failed));
        assert_eq!(record.status, VideoStatus::Failed);
    }

    #[test]
    fn test_complete_requires_url() {
        let mut record = VideoRecord::new("user-1", "Acme", "promo");
        let err = record
            .apply(VideoUpdate::Completed { url: " ".into() }, Utc::now())
            .unwrap_err();
        assert_eq!(err, TransitionError::MissingUrl);
        assert_eq!(record.status, VideoStatus::Processing);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [VideoStatus::Processing, VideoStatus::Completed, VideoStatus::Failed] {
            assert_eq!(VideoStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VideoStatus::parse("analyzed"), None);
    }

    #[test]
    fn test_summary_hides_error_message() {
        let mut record = VideoRecord::new("user-1", "Acme", "promo");
        record
            .apply(VideoUpdate::Failed { reason: "secret provider detail".into() }, Utc::now())
            .unwrap();
        let json = serde_json::to_string(&VideoSummary::from(&record)).unwrap();
        assert!(!json.contains("secret provider detail"));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"preset\":\"promo\""));
    }
}
