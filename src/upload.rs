//! Gateway to the third-party image-hosting service.
//!
//! The service takes the image base64-encoded in a form field and answers
//! with JSON carrying the public URL. Each failure mode is a distinct
//! `UploadError` for the logs, but callers only ever act on success or
//! failure.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;

use crate::config::UploadConfig;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("empty image payload")]
    EmptyImage,

    #[error("image host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image host returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("image host rejected the upload")]
    Rejected,

    #[error("malformed image host response")]
    MalformedResponse,
}

/// Uploads image bytes somewhere public and returns the URL.
/// `AppState` holds this as a trait object so tests can swap in a stub
/// instead of talking to the real service.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &[u8], filename: &str) -> Result<String, UploadError>;
}

/// Client for the imgbb-style upload API.
pub struct ImgbbClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct HostResponse {
    #[serde(default)]
    success: bool,
    data: Option<HostData>,
}

#[derive(Debug, Deserialize)]
struct HostData {
    url: Option<String>,
}

impl ImgbbClient {
    pub fn new(config: &UploadConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url_from_body(body: &str) -> Result<String, UploadError> {
        let parsed: HostResponse =
            serde_json::from_str(body).map_err(|_| UploadError::MalformedResponse)?;
        if !parsed.success {
            return Err(UploadError::Rejected);
        }
        parsed
            .data
            .and_then(|d| d.url)
            .ok_or(UploadError::MalformedResponse)
    }
}

#[async_trait]
impl ImageHost for ImgbbClient {
    async fn upload(&self, image: &[u8], filename: &str) -> Result<String, UploadError> {
        if image.is_empty() {
            return Err(UploadError::EmptyImage);
        }

        let encoded = BASE64.encode(image);
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("image", encoded.as_str()), ("name", filename)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }

        let body = response.text().await?;
        Self::url_from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_yields_url() {
        let body = r#"{"data":{"url":"https://i.ibb.co/abc/photo.jpg","display_url":"https://i.ibb.co/abc/photo.jpg"},"success":true,"status":200}"#;
        assert_eq!(
            ImgbbClient::url_from_body(body).unwrap(),
            "https://i.ibb.co/abc/photo.jpg"
        );
    }

    #[test]
    fn rejected_body_is_an_error() {
        let body = r#"{"success":false,"status":400}"#;
        assert!(matches!(
            ImgbbClient::url_from_body(body),
            Err(UploadError::Rejected)
        ));
    }

    #[test]
    fn success_without_url_is_malformed() {
        let body = r#"{"data":{},"success":true}"#;
        assert!(matches!(
            ImgbbClient::url_from_body(body),
            Err(UploadError::MalformedResponse)
        ));
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert!(matches!(
            ImgbbClient::url_from_body("<html>not json</html>"),
            Err(UploadError::MalformedResponse)
        ));
    }

    #[tokio::test]
    async fn empty_payload_fails_before_any_request() {
        // Endpoint is unroutable; an empty payload must fail without
        // ever reaching it.
        let client = ImgbbClient::new(&UploadConfig {
            api_key: "k".into(),
            endpoint: "http://192.0.2.1/upload".into(),
            timeout_secs: 1,
        })
        .unwrap();

        let result = client.upload(&[], "empty.jpg").await;
        assert!(matches!(result, Err(UploadError::EmptyImage)));
    }
}
