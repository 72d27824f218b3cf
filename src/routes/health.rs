use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}

/// Liveness probe; touches neither the history nor any upstream API.
async fn ping() -> (StatusCode, Json<Value>) {
    tracing::debug!("/ping reached");
    (StatusCode::OK, Json(json!({ "message": "pong" })))
}
