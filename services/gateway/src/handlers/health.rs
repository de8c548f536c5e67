use axum::{Json, extract::State, http::StatusCode};
use serde_json::Value;

use portico_core::health::readiness;

use crate::state::AppState;

/// `GET /readyz`: ready once the code store answers. The user service channel is lazy
/// and reconnects on its own, so it is not gated here.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let code_store = state.code_store().ping().await;
    readiness(&[("code_store", code_store)])
}
