//! Video generation handler.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use validator::Validate;

use vgen_models::MAX_TITLE_LEN;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::{GenerateInput, WorkflowError};
use crate::state::AppState;

/// Title length bound for the request body; validator compares lengths as `u64`.
const MAX_TITLE_CHARS: u64 = MAX_TITLE_LEN as u64;

/// Request body for `POST /api/generate-video`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateVideoRequest {
    #[validate(length(min = 1, max = 100, message = "Preset is required"))]
    pub preset: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[validate(length(max = MAX_TITLE_CHARS, message = "Title is too long"))]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    pub success: bool,
    pub video_id: String,
    pub video_url: String,
    pub message: String,
}

/// Generate one video and wait for it.
///
/// The workflow runs in its own task so a dropped connection cannot leave the
/// record half-finished.
pub async fn generate_video(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    body: Result<Json<GenerateVideoRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateVideoResponse>> {
    let Some(user) = user else {
        return Err(WorkflowError::Unauthorized.into());
    };

    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .next()
            .unwrap_or_else(|| "Invalid request".to_string());
        ApiError::bad_request(message)
    })?;

    let input = GenerateInput {
        preset_id: request.preset,
        fields: request.fields,
        title: request.title,
    };

    let workflow = state.workflow.clone();
    let uid = user.uid;
    let outcome = tokio::spawn(async move { workflow.run(Some(uid), input).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Generation task panicked");
            ApiError::internal("generation task aborted")
        })??;

    Ok(Json(GenerateVideoResponse {
        success: true,
        video_id: outcome.video_id.to_string(),
        video_url: outcome.video_url,
        message: "Video generated successfully".to_string(),
    }))
}
