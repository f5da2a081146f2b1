pub mod attendance;
pub mod auth;
pub mod batches;
pub mod coaches;
pub mod games;
pub mod notes;
pub mod payments;
pub mod players;
pub mod sessions;
pub mod users;

use axum::Json;
use serde_json::json;

use crate::error::ApiError;

/// Path ids arrive as strings so a malformed id gets the envelope 400
/// instead of the extractor's plain-text rejection.
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid id: {raw}")))
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
