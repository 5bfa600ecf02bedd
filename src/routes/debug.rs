use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::store;
use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/debug. Unauthenticated health snapshot: row counts and the
/// store location, handy when poking the service by hand.
pub async fn debug(State(state): State<AppState>) -> AppResult<Response> {
    let users = store::count_users(&state.db)?;
    let posts = store::count_posts(&state.db)?;
    Ok(Json(json!({
        "status": "working",
        "database": state.config.db_path().display().to_string(),
        "users": users,
        "posts": posts,
    }))
    .into_response())
}
