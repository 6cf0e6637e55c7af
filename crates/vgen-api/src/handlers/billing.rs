//! Plan and usage info.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use vgen_models::{MonthWindow, PlanTier};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::resolve_tier;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingInfoResponse {
    pub plan: PlanTier,
    /// `YYYY-MM`, UTC.
    pub month: String,
    pub videos_this_month: u32,
    /// `null` for unlimited plans.
    pub monthly_limit: Option<u32>,
    pub remaining: Option<u32>,
}

pub async fn billing_info(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<BillingInfoResponse>> {
    let tier = resolve_tier(state.plans.as_ref(), &user.uid).await?;
    let window = MonthWindow::current();
    let used = state.store.count_created_in(&user.uid, window).await?;

    Ok(Json(BillingInfoResponse {
        plan: tier,
        month: window.label(),
        videos_this_month: used,
        monthly_limit: state.quota.monthly_limit(tier),
        remaining: state.quota.remaining(tier, used),
    }))
}
