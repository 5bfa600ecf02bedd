use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::PublicUser;
use crate::db::{store, DEFAULT_AVATAR_URL};
use crate::error::{AppError, AppResult};
use crate::password::hash_password;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 4;

#[derive(Default)]
struct RegisterForm {
    name: String,
    phone: String,
    password: String,
    avatar: Option<(Vec<u8>, String)>,
}

#[derive(Deserialize, Default)]
struct RegisterBody {
    name: Option<String>,
    phone: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize, Default)]
struct LoginBody {
    phone: Option<String>,
    password: Option<String>,
}

/// POST /api/register. Accepts a multipart form (optionally carrying an
/// avatar image) or a plain JSON body with the same field names.
pub async fn register(State(state): State<AppState>, request: Request) -> AppResult<Response> {
    let form = read_register_input(&state, request).await?;

    let name = form.name.trim().to_string();
    let phone = form.phone.trim().to_string();
    if name.is_empty() || phone.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "Name, phone and password are required".into(),
        ));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let avatar = match form.avatar {
        Some((bytes, filename)) => match state.images.upload(&bytes, &filename).await {
            Ok(url) => url,
            Err(e) => {
                // Avatar failure must not block registration; fall back
                // to the placeholder and keep going.
                tracing::warn!("Avatar upload failed, using default: {}", e);
                DEFAULT_AVATAR_URL.to_string()
            }
        },
        None => DEFAULT_AVATAR_URL.to_string(),
    };

    let password_hash = hash_password(&form.password);
    let user = store::create_user(&state.db, &name, &phone, &password_hash, &avatar)?;
    tracing::info!("Registered user {} ({})", user.name, user.id);

    Ok(Json(json!({
        "success": true,
        "message": "Account created",
        "user": PublicUser::from(&user),
    }))
    .into_response())
}

/// POST /api/login. Verifies the phone and password digest.
pub async fn login(State(state): State<AppState>, request: Request) -> AppResult<Response> {
    let body: LoginBody = super::json_body_or_default(request).await?;
    let phone = body.phone.unwrap_or_default().trim().to_string();
    let password = body.password.unwrap_or_default();
    if phone.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Phone and password are required".into()));
    }

    match store::find_user_by_phone(&state.db, &phone)? {
        Some(user) if user.password_hash == hash_password(&password) => {
            tracing::info!("User {} logged in", user.id);
            Ok(Json(json!({"success": true, "user": PublicUser::from(&user)})).into_response())
        }
        _ => Err(AppError::Unauthorized),
    }
}

async fn read_register_input(state: &AppState, request: Request) -> AppResult<RegisterForm> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
        let mut form = RegisterForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| AppError::Validation("Invalid multipart form".into()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "name" => {
                    form.name = field
                        .text()
                        .await
                        .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
                }
                "phone" => {
                    form.phone = field
                        .text()
                        .await
                        .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
                }
                "password" => {
                    form.password = field
                        .text()
                        .await
                        .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
                }
                "avatar" => {
                    let filename = field.file_name().unwrap_or("avatar.jpg").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|_| AppError::Validation("Invalid multipart form".into()))?;
                    if !bytes.is_empty() {
                        form.avatar = Some((bytes.to_vec(), filename));
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    } else {
        let body: RegisterBody = super::json_body_or_default(request).await?;
        Ok(RegisterForm {
            name: body.name.unwrap_or_default(),
            phone: body.phone.unwrap_or_default(),
            password: body.password.unwrap_or_default(),
            avatar: None,
        })
    }
}
