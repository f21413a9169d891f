//! Oversight route handlers

use crate::error::ApiResult;
use crate::models::SuccessResponse;
use crate::oversight::{AlertTrigger, HierarchyStatus};
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;

/// Combined status of the three oversight layers
pub async fn get_status(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<HierarchyStatus>>> {
    let status = state.orchestrator.oversight().status();
    Ok(Json(SuccessResponse::with_data("Oversight status", status)))
}

/// Open tactical alerts, oldest first
pub async fn list_alerts(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<Vec<AlertTrigger>>>> {
    let alerts = state.orchestrator.oversight().tactical().alerts();
    Ok(Json(SuccessResponse::with_data(
        format!("{} open alerts", alerts.len()),
        alerts,
    )))
}
