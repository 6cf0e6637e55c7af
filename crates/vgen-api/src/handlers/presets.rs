//! Preset listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use vgen_models::Preset;

use crate::state::AppState;

#[derive(Serialize)]
pub struct PresetListResponse {
    pub presets: Vec<Preset>,
}

/// All presets in catalog order. Public.
pub async fn list_presets(State(state): State<AppState>) -> Json<PresetListResponse> {
    Json(PresetListResponse {
        presets: state.catalog.all().to_vec(),
    })
}
