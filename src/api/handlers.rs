//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::TimerError,
    state::{AppState, TimerConfiguration, HAPTIC_NONE},
};
use super::{
    assets,
    responses::{HapticPreviewRequest, RestoreDefaultsResponse},
};

/// Handle GET /api/config - Return the current configuration, pretty-printed
pub async fn get_config_handler(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let config = state.store.get();
    match serde_json::to_vec_pretty(&*config) {
        Ok(body) => {
            debug!("Returning {} timer(s)", config.timers.len());
            Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
        Err(e) => {
            error!("Failed to serialize configuration: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /api/config - Replace and persist the configuration
pub async fn save_config_handler(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, StatusCode> {
    let config = match parse_configuration(&body) {
        Ok(config) => config,
        Err(e) => {
            error!("Rejected configuration: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let count = config.timers.len();
    let store = Arc::clone(&state.store);
    if let Err(e) = tokio::task::spawn_blocking(move || store.update(config)).await {
        error!("Configuration update task failed: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    info!("Configuration with {} timer(s) received", count);
    Ok(StatusCode::OK)
}

/// Handle POST /api/haptic-preview - Play a haptic without starting a timer
pub async fn haptic_preview_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let request: HapticPreviewRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Invalid haptic preview request: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let name = request.haptic_name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case(HAPTIC_NONE) {
        debug!("Haptic preview for '{}' skipped", name);
    } else {
        info!("Previewing haptic: {}", name);
        state.haptics.raise_event(name);
    }
    StatusCode::OK
}

/// Handle POST /api/restore-defaults - Add missing default presets
pub async fn restore_defaults_handler(
    State(state): State<AppState>,
) -> Result<Json<RestoreDefaultsResponse>, StatusCode> {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.restore_defaults()).await {
        Ok(added) => Ok(Json(RestoreDefaultsResponse::new(added, state.store.get().timers.len()))),
        Err(e) => {
            error!("Restore defaults task failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Serve an embedded UI asset for any other path
pub async fn static_asset_handler(method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        debug!("No handler for {} {}", method, uri.path());
        return StatusCode::NOT_FOUND.into_response();
    }

    match assets::find(uri.path()) {
        Some(asset) => ([(header::CONTENT_TYPE, asset.content_type())], asset.bytes).into_response(),
        None => {
            warn!("Resource not found: {}", uri.path());
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Unsupported method on an API path
pub async fn not_found_handler(method: Method, uri: Uri) -> StatusCode {
    debug!("No handler for {} {}", method, uri.path());
    StatusCode::NOT_FOUND
}

/// Decode a posted configuration and check that its ids are unique
fn parse_configuration(body: &[u8]) -> Result<TimerConfiguration, TimerError> {
    let config: TimerConfiguration =
        serde_json::from_slice(body).map_err(|e| TimerError::RequestProcessing(e.to_string()))?;

    if let Some(id) = config.duplicate_id() {
        return Err(TimerError::RequestProcessing(format!("duplicate timer id: {}", id)));
    }
    Ok(config)
}
