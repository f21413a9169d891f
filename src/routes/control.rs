//! Orchestrator control route handlers
//!
//! Lifecycle, event injection, state, metrics and directors.

use crate::directors::{DirectorStatus, OversightResult};
use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{
    DirectorRole, EnvironmentalEvent, EventSource, EventType, MessageResponse, Severity,
    SuccessResponse, SystemState, SystemStateUpdate,
};
use crate::orchestrator::{OrchestratorMetrics, Transition};
use crate::persistence::PerformanceMetrics;
use crate::state::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

fn transition_message(transition: Transition) -> &'static str {
    match transition {
        Transition::Started => "Orchestrator started",
        Transition::AlreadyRunning => "Orchestrator already running",
        Transition::Stopped => "Orchestrator stopped",
        Transition::AlreadyStopped => "Orchestrator already stopped",
    }
}

/// Start the orchestrator (no-op if running)
pub async fn start(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<Transition>>> {
    let transition = state.orchestrator.start().await;
    Ok(Json(SuccessResponse::with_data(transition_message(transition), transition)))
}

/// Stop the orchestrator (no-op if stopped)
pub async fn stop(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<Transition>>> {
    let transition = state.orchestrator.stop().await;
    Ok(Json(SuccessResponse::with_data(transition_message(transition), transition)))
}

/// Request to inject an environmental event
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InjectEventRequest {
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Ordinal 1 (minimal) to 5 (critical)
    #[validate(range(min = 1, max = 5, message = "Severity must be between 1 and 5"))]
    pub severity: u8,

    #[validate(length(min = 1, max = 2000, message = "Description is required (max 2000 chars)"))]
    pub description: String,

    pub source: Option<EventSource>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectEventResponse {
    pub event_id: Uuid,
    pub queue_depth: usize,
}

pub async fn inject_event(
    State(state): State<SharedState>,
    Json(payload): Json<InjectEventRequest>,
) -> ApiResult<Json<SuccessResponse<InjectEventResponse>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let severity = Severity::from_level(payload.severity)
        .ok_or_else(|| validation_error("Severity must be between 1 and 5"))?;

    let mut event = EnvironmentalEvent::new(
        payload.event_type,
        severity,
        payload.source.unwrap_or(EventSource::Manual),
        payload.description,
    );
    event.metadata = payload.metadata;

    let event_id = event.id;
    let queue_depth = state.orchestrator.inject_event(event).await;
    info!("📥 Event {} injected via API (queue depth {})", event_id, queue_depth);

    Ok(Json(SuccessResponse::with_data(
        "Event queued",
        InjectEventResponse { event_id, queue_depth },
    )))
}

pub async fn get_metrics(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<OrchestratorMetrics>>> {
    let metrics = state.orchestrator.get_metrics().await;
    Ok(Json(SuccessResponse::with_data("Orchestrator metrics", metrics)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Most recent performance samples, newest first
pub async fn get_metrics_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<SuccessResponse<Vec<PerformanceMetrics>>>> {
    let limit = query.limit.unwrap_or(50).min(1000);
    let history = state.orchestrator.performance_history(limit).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} samples", history.len()),
        history,
    )))
}

pub async fn get_state(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<Arc<SystemState>>>> {
    Ok(Json(SuccessResponse::with_data("Current system state", state.orchestrator.get_state())))
}

/// Overlay whole domain blocks onto the current state
pub async fn update_state(
    State(state): State<SharedState>,
    Json(update): Json<SystemStateUpdate>,
) -> ApiResult<Json<SuccessResponse<Arc<SystemState>>>> {
    if update.is_empty() {
        return Err(validation_error("Update must contain at least one domain block"));
    }
    if let Some(confidence) = update.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(validation_error("Confidence must be within [0, 1]"));
        }
    }

    let next = state.orchestrator.update_system_state(&update);
    Ok(Json(SuccessResponse::with_data("System state updated", next)))
}

pub async fn list_directors(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<DirectorStatus>>>> {
    let directors = state.orchestrator.director_status();
    Ok(Json(SuccessResponse::with_data(
        format!("{} directors", directors.len()),
        directors,
    )))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Activate or deactivate one director
pub async fn set_director_active(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    Json(payload): Json<SetActiveRequest>,
) -> ApiResult<Json<SuccessResponse<DirectorStatus>>> {
    let role: DirectorRole = role.parse().map_err(AppError::BadRequest)?;
    let status = state.orchestrator.set_director_active(role, payload.active)?;
    let verb = if payload.active { "activated" } else { "deactivated" };
    Ok(Json(SuccessResponse::with_data(format!("Director {} {}", role, verb), status)))
}

/// Run one director's domain review against the current state
pub async fn director_oversight(
    State(state): State<SharedState>,
    Path(role): Path<String>,
) -> ApiResult<Json<SuccessResponse<OversightResult>>> {
    let role: DirectorRole = role.parse().map_err(AppError::BadRequest)?;
    let result = state.orchestrator.director_oversight(role)?;
    Ok(Json(SuccessResponse::with_data(format!("{} oversight complete", role), result)))
}

/// Dispatch queued events immediately
pub async fn drain(State(state): State<SharedState>) -> ApiResult<Json<MessageResponse>> {
    let reports = state.orchestrator.drain_now().await;
    Ok(Json(MessageResponse::new(format!("Processed {} events", reports.len()))))
}
