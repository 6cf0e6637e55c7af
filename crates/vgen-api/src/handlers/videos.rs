//! Video listing and lookup.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vgen_models::{VideoId, VideoStatus, VideoSummary};
use vgen_store::{PageRequest, VideoFilter, DEFAULT_PAGE_SIZE};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListVideosQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `processing`, `completed`, `failed` or `all`.
    pub status: Option<String>,
}

impl ListVideosQuery {
    fn filter(&self) -> ApiResult<VideoFilter> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(VideoFilter::all()),
            Some(s) => VideoStatus::parse(s)
                .map(VideoFilter::with_status)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid status filter: {}", s))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoSummary>,
    pub pagination: Pagination,
}

/// The caller's videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListVideosQuery>,
) -> ApiResult<Json<VideoListResponse>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(DEFAULT_PAGE_SIZE));

    let result = state.store.list_by_user(&user.uid, filter, page).await?;

    Ok(Json(VideoListResponse {
        videos: result.records.iter().map(VideoSummary::from).collect(),
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total: result.total,
            pages: result.pages(page.limit),
        },
    }))
}

/// One of the caller's videos. Other users' videos are reported as missing.
pub async fn get_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoSummary>> {
    if video_id.is_empty() || video_id.len() > 128 {
        return Err(ApiError::bad_request("Invalid video ID"));
    }

    let record = state
        .store
        .get(&VideoId::from_string(video_id))
        .await?
        .filter(|r| r.user_id == user.uid)
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(Json(VideoSummary::from(&record)))
}
