//! Dashboard counters.

use axum::extract::State;
use axum::Json;

use vgen_models::MonthWindow;
use vgen_store::VideoStats;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Totals by status plus this month's count.
pub async fn dashboard_stats(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<VideoStats>> {
    let stats = state.store.stats(&user.uid, MonthWindow::current()).await?;
    Ok(Json(stats))
}
