use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

/// GET /. Serves the landing document.
pub async fn index() -> Response {
    serve_embedded("index.html")
}

/// Fallback for every unmatched path: the matching embedded asset if one
/// exists, otherwise the landing document (single-page-application
/// routing). Lookups only touch the compile-time embedded set, so no
/// path can escape the served root.
pub async fn serve(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let target = if !path.is_empty() && Assets::get(path).is_some() {
        path
    } else {
        "index.html"
    };
    serve_embedded(target)
}

fn serve_embedded(path: &str) -> Response {
    match Assets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                file.data.to_vec(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
