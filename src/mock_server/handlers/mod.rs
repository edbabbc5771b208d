//! HTTP request handlers for the mock server.

pub mod issues;
pub mod listings;

pub use issues::*;
pub use listings::*;

use std::sync::Arc;

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::mock_server::state::MockState;

pub(crate) type SharedState = Arc<RwLock<MockState>>;

/// Error body in the tracker's shape: `{"code": ..., "message": ...}`.
pub(crate) fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "code": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Reject the request when the state requires a token and the bearer does not match.
pub(crate) fn authorize(state: &MockState, headers: &HeaderMap) -> Option<Response> {
    let expected = state.required_token.as_ref()?;
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected.as_str()) {
        None
    } else {
        Some(error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or missing token"))
    }
}

/// First value of a query parameter.
pub(crate) fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Numeric query parameter with a default; `Err` carries the 400 response.
pub(crate) fn numeric_param(
    params: &[(String, String)],
    key: &str,
    default: usize,
) -> Result<usize, Response> {
    match param(params, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            error(
                StatusCode::BAD_REQUEST,
                "invalid_parameter",
                format!("{key} must be a non-negative integer"),
            )
        }),
    }
}

/// Keep only the requested `fields` (plus `id`) of a serialized record.
pub(crate) fn project_fields(value: Value, fields: Option<&str>) -> Value {
    let (Some(fields), Value::Object(map)) = (fields, &value) else {
        return value;
    };

    let wanted: Vec<&str> = fields.split(',').map(str::trim).collect();
    let projected = map
        .iter()
        .filter(|(k, _)| k.as_str() == "id" || wanted.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(projected)
}

/// Count a list request against the injected failure budget.
pub(crate) fn admit_list(state: &mut MockState) -> Option<Response> {
    if state.admit_list_request() {
        None
    } else {
        Some(error(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "listing temporarily unavailable",
        ))
    }
}
