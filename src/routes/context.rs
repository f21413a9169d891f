//! Context and insight route handlers

use crate::context::{ContextMetrics, ContextView, RefreshOutcome};
use crate::error::{ApiResult, AppError};
use crate::insights::rules::InsightRule;
use crate::insights::Recommendation;
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    #[serde(flatten)]
    pub view: ContextView,
    pub metrics: ContextMetrics,
}

/// Current context, rebuilt when the TTL has expired
pub async fn get_context(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<ContextResponse>>> {
    let view = state.context.get_context().await?;
    let message = match &view.stale_reason {
        Some(reason) => format!("Context {} (stale: {})", view.context.version(), reason),
        None => format!("Context {}", view.context.version()),
    };
    Ok(Json(SuccessResponse::with_data(
        message,
        ContextResponse {
            view,
            metrics: state.context.metrics(),
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub force: bool,
}

/// Refresh the context; rejected refreshes are reported, not raised
pub async fn refresh_context(
    State(state): State<SharedState>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Json<SuccessResponse<RefreshOutcome>>> {
    let outcome = state.context.refresh_context(query.force).await;
    let message = match &outcome {
        RefreshOutcome::Updated(update) if update.from_cache => {
            format!("Context {} still fresh", update.context.version())
        }
        RefreshOutcome::Updated(update) => format!(
            "Context refreshed to {} ({} changes)",
            update.context.version(),
            update.changes.len()
        ),
        RefreshOutcome::Rejected { reason, .. } => format!("Refresh rejected: {}", reason),
        RefreshOutcome::Superseded { current } => {
            format!("Refresh superseded by context {}", current.version())
        }
        RefreshOutcome::Busy => {
            return Err(AppError::Conflict(
                "A context refresh is already in progress; retry or use force=true".to_string(),
            ))
        }
    };
    Ok(Json(SuccessResponse::with_data(message, outcome)))
}

pub async fn list_insights(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<Recommendation>>>> {
    let latest = state.insights.latest();
    let message = match state.insights.generated_at() {
        Some(at) => format!("{} recommendations as of {}", latest.len(), at.to_rfc3339()),
        None => "No recommendations generated yet".to_string(),
    };
    Ok(Json(SuccessResponse::with_data(message, latest)))
}

/// Heuristics behind the rule-based generator
pub async fn list_insight_rules(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<InsightRule>>>> {
    let rules = state.rules.list_rules().to_vec();
    Ok(Json(SuccessResponse::with_data(format!("{} rules", rules.len()), rules)))
}
