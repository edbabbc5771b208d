//! Issue endpoint handlers.
//!
//! `GET /issues` pages by cursor. Cursor tokens embed the signature of the
//! query that issued them, so a token replayed against a different filter or
//! field set is rejected with `invalid_cursor`.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use crate::mock_server::state::CreateError;
use crate::query_signature;

use super::{admit_list, authorize, error, numeric_param, param, project_fields, SharedState};

/// Page size when the request carries no `limit`.
const DEFAULT_LIMIT: usize = 100;

/// Largest page the server hands out, whatever `limit` says.
const MAX_LIMIT: usize = 500;

fn encode_cursor(offset: usize, signature: &str) -> String {
    format!("{offset}.{signature}")
}

fn decode_cursor(token: &str, signature: &str) -> Option<usize> {
    let (offset, issued_for) = token.split_once('.')?;
    if issued_for != signature {
        return None;
    }
    offset.parse().ok()
}

/// GET /issues
pub async fn list_issues(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let mut state = state.write().await;
    if let Some(denied) = authorize(&state, &headers) {
        return denied;
    }
    if let Some(unavailable) = admit_list(&mut state) {
        return unavailable;
    }

    let limit = match numeric_param(&params, "limit", DEFAULT_LIMIT) {
        Ok(0) => {
            return error(StatusCode::BAD_REQUEST, "invalid_parameter", "limit must be positive")
        }
        Ok(limit) => limit.min(MAX_LIMIT),
        Err(response) => return response,
    };

    let signature = query_signature("issues", &params);
    let offset = match param(&params, "cursor") {
        None => 0,
        Some(token) => match decode_cursor(token, &signature) {
            Some(offset) => offset,
            None => {
                return error(
                    StatusCode::BAD_REQUEST,
                    "invalid_cursor",
                    "cursor is stale or was issued for a different query",
                )
            }
        },
    };

    let matching = state.list_issues(param(&params, "project"), param(&params, "status"));
    let total = matching.len();
    let start = offset.min(total);
    let end = (start + limit).min(total);

    let fields = param(&params, "fields");
    let items: Vec<Value> = matching[start..end]
        .iter()
        .map(|issue| project_fields(json!(issue), fields))
        .collect();

    let next_cursor = (end < total).then(|| encode_cursor(end, &signature));
    let prev_cursor = (start > 0).then(|| encode_cursor(start.saturating_sub(limit), &signature));

    (
        StatusCode::OK,
        Json(json!({
            "items": items,
            "next_cursor": next_cursor,
            "prev_cursor": prev_cursor,
            "total": total,
        })),
    )
        .into_response()
}

/// POST /projects/{project}/issues
pub async fn create_issue(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(project): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.write().await;
    if let Some(denied) = authorize(&state, &headers) {
        return denied;
    }

    match state.create_issue(&project, &body) {
        Ok(issue) => (StatusCode::CREATED, Json(issue)).into_response(),
        Err(CreateError::UnknownProject) => error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("No project found with id or key: {project}"),
        ),
        Err(CreateError::MissingTitle) => error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_failed",
            "title is required",
        ),
        Err(CreateError::Injected) => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "issue could not be created",
        ),
    }
}

/// PATCH /issues/{id}
pub async fn update_issue(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.write().await;
    if let Some(denied) = authorize(&state, &headers) {
        return denied;
    }

    match state.update_issue(&id, &body) {
        Some(issue) => (StatusCode::OK, Json(issue.clone())).into_response(),
        None => error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("No issue found with id: {id}"),
        ),
    }
}

/// DELETE /issues/{id}
pub async fn delete_issue(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = state.write().await;
    if let Some(denied) = authorize(&state, &headers) {
        return denied;
    }

    if state.delete_issue(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("No issue found with id: {id}"),
        )
    }
}
