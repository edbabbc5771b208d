//! Offset-paged directory handlers (projects and users).

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::{admit_list, authorize, numeric_param, param, project_fields, SharedState};

/// Page size when the request carries no `top`.
const DEFAULT_TOP: usize = 100;

/// Largest page the server hands out.
const MAX_TOP: usize = 500;

fn window(params: &[(String, String)]) -> Result<(usize, usize), Response> {
    let skip = numeric_param(params, "skip", 0)?;
    let top = numeric_param(params, "top", DEFAULT_TOP)?.min(MAX_TOP);
    Ok((skip, top))
}

/// GET /projects
///
/// Answers `{"items": [...], "total": n}`.
pub async fn list_projects(
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
    let (skip, top) = match window(&params) {
        Ok(window) => window,
        Err(response) => return response,
    };

    let matching = state.list_projects(param(&params, "team"));
    let total = matching.len();
    let fields = param(&params, "fields");
    let items: Vec<Value> = matching
        .into_iter()
        .skip(skip)
        .take(top)
        .map(|project| project_fields(json!(project), fields))
        .collect();

    (StatusCode::OK, Json(json!({ "items": items, "total": total }))).into_response()
}

/// GET /users
///
/// Answers a bare JSON array, without a total.
pub async fn list_users(
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
    let (skip, top) = match window(&params) {
        Ok(window) => window,
        Err(response) => return response,
    };

    let fields = param(&params, "fields");
    let items: Vec<Value> = state
        .users
        .iter()
        .skip(skip)
        .take(top)
        .map(|user| project_fields(json!(user), fields))
        .collect();

    (StatusCode::OK, Json(items)).into_response()
}
