//! REST API handlers for banner rotation and operational endpoints.
//!
//! Requests map 1:1 onto the engine operations. Identifier validation
//! (zero is the reserved "no value" sentinel) happens here, at the API
//! boundary; the engine accepts whatever it is given.

use crate::service::RotationService;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rotation_core::error::RotationError;
use rotation_core::types::{BannerId, SlotId, UserGroupId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RotationService>,
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBannerRequest {
    pub slot_id: SlotId,
    pub banner_id: BannerId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBannerRequest {
    pub slot_id: SlotId,
    pub banner_id: BannerId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordClickRequest {
    pub slot_id: SlotId,
    pub banner_id: BannerId,
    pub user_group_id: UserGroupId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBannerRequest {
    pub slot_id: SlotId,
    pub user_group_id: UserGroupId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBannerResponse {
    pub banner_id: BannerId,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> ApiError {
    metrics::counter!("api.validation_errors").increment(1);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid_request".to_string(),
            message: message.to_string(),
        }),
    )
}

/// Translate a service failure into an HTTP response. `SlotNotFound` and
/// validation failures are the client's fault; everything else is a 500
/// with a generic body.
fn map_error(e: RotationError, operation: &'static str) -> ApiError {
    if e.is_client_error() {
        warn!(operation, error = %e, "Request rejected");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: operation.to_string(),
                message: e.to_string(),
            }),
        )
    } else {
        error!(operation, error = %e, "Request processing failed");
        metrics::counter!("api.errors").increment(1);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: operation.to_string(),
                message: "Internal processing error".to_string(),
            }),
        )
    }
}

/// POST /add-banner
pub async fn add_banner(
    State(state): State<AppState>,
    Json(request): Json<AddBannerRequest>,
) -> Result<StatusCode, ApiError> {
    if request.slot_id.is_zero() || request.banner_id.is_zero() {
        return Err(bad_request("slotId and bannerId are required"));
    }

    state
        .service
        .add_banner(request.slot_id, request.banner_id)
        .await
        .map_err(|e| map_error(e, "add_banner_failed"))?;

    metrics::counter!("api.banners_added").increment(1);
    Ok(StatusCode::OK)
}

/// POST /remove-banner
pub async fn remove_banner(
    State(state): State<AppState>,
    Json(request): Json<RemoveBannerRequest>,
) -> Result<StatusCode, ApiError> {
    if request.slot_id.is_zero() || request.banner_id.is_zero() {
        return Err(bad_request("slotId and bannerId are required"));
    }

    state
        .service
        .remove_banner(request.slot_id, request.banner_id)
        .await
        .map_err(|e| map_error(e, "remove_banner_failed"))?;

    Ok(StatusCode::OK)
}

/// POST /record-click
pub async fn record_click(
    State(state): State<AppState>,
    Json(request): Json<RecordClickRequest>,
) -> Result<StatusCode, ApiError> {
    if request.slot_id.is_zero() || request.banner_id.is_zero() || request.user_group_id.is_zero() {
        return Err(bad_request("slotId, bannerId and userGroupId are required"));
    }

    state
        .service
        .record_click(request.slot_id, request.banner_id, request.user_group_id)
        .await
        .map_err(|e| map_error(e, "record_click_failed"))?;

    metrics::counter!("api.clicks_recorded").increment(1);
    Ok(StatusCode::OK)
}

/// POST /select-banner
pub async fn select_banner(
    State(state): State<AppState>,
    Json(request): Json<SelectBannerRequest>,
) -> Result<Json<SelectBannerResponse>, ApiError> {
    if request.slot_id.is_zero() || request.user_group_id.is_zero() {
        return Err(bad_request("slotId and userGroupId are required"));
    }

    let selected = state
        .service
        .select_banner(request.slot_id, request.user_group_id)
        .await
        .map_err(|e| map_error(e, "select_banner_failed"))?;

    match selected {
        Some(banner_id) => {
            metrics::counter!("api.banners_selected").increment(1);
            Ok(Json(SelectBannerResponse { banner_id }))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no_banner_available".to_string(),
                message: "No banner available for the given slot and user group".to_string(),
            }),
        )),
    }
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready - readiness probe.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live - liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
