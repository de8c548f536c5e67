use axum::Json;
use axum::http::StatusCode;
use serde_json::{Map, Value, json};

/// Liveness handler for `GET /healthz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Build a readiness response from named dependency checks.
///
/// Returns 200 when every check passed, 503 otherwise. The body lists each
/// dependency as `"ok"` or `"unavailable"`.
pub fn readiness(checks: &[(&str, bool)]) -> (StatusCode, Json<Value>) {
    let mut deps = Map::new();
    for (name, ok) in checks {
        let state = if *ok { "ok" } else { "unavailable" };
        deps.insert((*name).to_owned(), Value::from(state));
    }
    let ready = checks.iter().all(|(_, ok)| *ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "ready": ready, "dependencies": deps })))
}
