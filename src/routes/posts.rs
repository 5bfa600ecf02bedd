use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::FeedPost;
use crate::db::store;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LikeBody {
    user_id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CommentBody {
    user_id: Option<String>,
    text: Option<String>,
}

/// GET /api/posts. Returns the aggregated feed, newest first.
///
/// This endpoint never fails outward: any storage error is logged and
/// an empty feed is returned so the page keeps rendering.
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<FeedPost>> {
    match store::list_posts_with_aggregates(&state.db) {
        Ok(feed) => Json(feed),
        Err(e) => {
            tracing::error!("Feed query failed, returning empty feed: {}", e);
            Json(Vec::new())
        }
    }
}

/// POST /api/posts. Multipart form with a `photo` file and a `userId`
/// field; the image goes to the external host and only its URL is kept.
pub async fn create_post(State(state): State<AppState>, request: Request) -> AppResult<Response> {
    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|_| AppError::Validation("Expected a multipart form with a photo".into()))?;

    let mut user_id = String::new();
    let mut photo: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Invalid multipart form".into()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "userId" => {
                user_id = field
                    .text()
                    .await
                    .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
            }
            "photo" => {
                let filename = field.file_name().unwrap_or("photo.jpg").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
                if !bytes.is_empty() {
                    photo = Some((bytes.to_vec(), filename));
                }
            }
            _ => {}
        }
    }

    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Validation("userId is required".into()));
    }
    let (bytes, filename) =
        photo.ok_or_else(|| AppError::Validation("Photo file is required".into()))?;

    let user = store::find_user_by_id(&state.db, &user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let photo_url = match state.images.upload(&bytes, &filename).await {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Photo upload failed: {}", e);
            return Err(e.into());
        }
    };

    let post = store::create_post(&state.db, &user, &photo_url)?;
    tracing::info!("Created post {} by {}", post.id, user.name);

    Ok(Json(json!({"success": true, "message": "Post published"})).into_response())
}

/// POST /api/posts/{id}/like. Records a like; liking a post twice with
/// the same user is a no-op, not a toggle.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let body: LikeBody = super::json_body_or_default(request).await?;
    let user_id = body.user_id.unwrap_or_default().trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Validation("userId is required".into()));
    }

    if store::find_user_by_id(&state.db, &user_id)?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    if !store::post_exists(&state.db, &post_id)? {
        return Err(AppError::NotFound("Post not found".into()));
    }

    let likes = store::add_like(&state.db, &post_id, &user_id)?;
    Ok(Json(json!({"success": true, "likes": likes})).into_response())
}

/// POST /api/posts/{id}/comment. Appends a comment to a post.
pub async fn comment_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let body: CommentBody = super::json_body_or_default(request).await?;
    let user_id = body.user_id.unwrap_or_default().trim().to_string();
    let text = body.text.unwrap_or_default().trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Validation("userId is required".into()));
    }
    if text.is_empty() {
        return Err(AppError::Validation("Comment text is required".into()));
    }

    let user = store::find_user_by_id(&state.db, &user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if !store::post_exists(&state.db, &post_id)? {
        return Err(AppError::NotFound("Post not found".into()));
    }

    store::add_comment(&state.db, &post_id, &user, &text)?;
    Ok(Json(json!({"success": true})).into_response())
}
