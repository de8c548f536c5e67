use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;

use portico_core::health::healthz;
use portico_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    account::{login, register},
    health::readyz,
    password_reset::{forgot_password, reset_password},
    profile::{change_password, get_profile, update_profile, upload_photo},
};
use crate::state::AppState;

/// Slack on top of the avatar cap for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let photo_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Password reset
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        // Account
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        // Profile
        .route("/user/profile", get(get_profile).put(update_profile))
        .route("/user/change-password", post(change_password))
        .route(
            "/user/photo",
            post(upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
}
