pub mod assets;
pub mod auth;
pub mod debug;
pub mod posts;

use axum::extract::{DefaultBodyLimit, Request};
use axum::routing::{get, post};
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const BODY_LIMIT: usize = 64 * 1024;

/// Assemble the application router: the JSON API plus the embedded
/// frontend with its single-page fallback.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/{id}/like", post(posts::like_post))
        .route("/api/posts/{id}/comment", post(posts::comment_post))
        .route("/api/debug", get(debug::debug))
        .fallback(assets::serve)
        // Photos arrive as multipart bodies; match the image host's
        // 32 MB upload cap instead of the 2 MiB default.
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .with_state(state)
}

/// Read a JSON request body leniently: an absent or malformed body
/// behaves like an empty object, so missing-field validation always
/// answers in this service's own response shape.
pub(crate) async fn json_body_or_default<T>(request: Request) -> AppResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let bytes = axum::body::to_bytes(request.into_body(), BODY_LIMIT)
        .await
        .map_err(|_| AppError::Validation("Invalid request body".into()))?;
    Ok(serde_json::from_slice(&bytes).unwrap_or_default())
}
