//! Uploading product images to an image-hosting endpoint.

use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no image upload endpoint configured")]
    NotConfigured,
    #[error("failed to read image file '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not reach the image upload endpoint")]
    Transport(#[source] reqwest::Error),
    #[error("image upload rejected with {status}")]
    Status { status: StatusCode, body: String },
    #[error("image upload response did not contain a url")]
    Decode(#[source] serde_json::Error),
}

/// An image read into memory, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            content_type: content_type_for(&file_name).to_string(),
            file_name,
            bytes,
        }
    }

    /// Read an image from disk, deriving its content type from the extension.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// MIME type by file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Stores an image and returns its public URL.
#[allow(async_fn_in_trait)]
pub trait ImageUploader {
    async fn upload(&self, image: ImageFile) -> Result<String, UploadError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    file_name: &'a str,
    content_type: &'a str,
    image_data: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Uploads images as base64 encoded JSON.
#[derive(Debug, Clone)]
pub struct HttpImageUploader {
    http: reqwest::Client,
    endpoint: Option<Url>,
}

impl HttpImageUploader {
    pub fn new(endpoint: Url) -> Result<Self, UploadError> {
        Ok(Self {
            http: build_http_client()?,
            endpoint: Some(endpoint),
        })
    }

    /// An uploader that rejects every upload with [UploadError::NotConfigured].
    pub fn unconfigured() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: None,
        }
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }
}

impl ImageUploader for HttpImageUploader {
    #[instrument(skip_all, fields(file_name = %image.file_name, size = image.bytes.len()))]
    async fn upload(&self, image: ImageFile) -> Result<String, UploadError> {
        let endpoint = self.endpoint.clone().ok_or(UploadError::NotConfigured)?;

        let body = UploadRequest {
            file_name: &image.file_name,
            content_type: &image.content_type,
            image_data: BASE64.encode(&image.bytes),
        };

        let response = self
            .http
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(UploadError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "image upload rejected");
            return Err(UploadError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(UploadError::Transport)?;
        let UploadResponse { url } = serde_json::from_slice(&bytes).map_err(UploadError::Decode)?;
        debug!(%url, "uploaded image");
        Ok(url)
    }
}

fn build_http_client() -> Result<reqwest::Client, UploadError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(UploadError::Transport)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.gif"), "image/gif");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.svg"), "image/svg+xml");
        assert_eq!(content_type_for("a.tiff"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn reads_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shirt.png");
        std::fs::write(&path, b"png bytes").unwrap();

        let image = ImageFile::read(&path).unwrap();
        assert_eq!(image, ImageFile {
            file_name: "shirt.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"png bytes".to_vec(),
        });
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageFile::read(dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }

    #[tokio::test]
    async fn posts_base64_payload_and_returns_url() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/dev/upload").json_body(json!({
                "fileName": "shirt.png",
                "contentType": "image/png",
                "imageData": "aGVsbG8=",
            }));
            then.status(200)
                .json_body(json!({ "url": "https://images.example.com/shirt.png" }));
        });

        let uploader = HttpImageUploader::new(server.url("/dev/upload").parse().unwrap()).unwrap();
        let url = uploader
            .upload(ImageFile::new("shirt.png", b"hello".to_vec()))
            .await
            .unwrap();

        assert_eq!(url, "https://images.example.com/shirt.png");
        mock.assert();
    }

    #[tokio::test]
    async fn rejected_upload_keeps_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(413).body("too large");
        });

        let uploader = HttpImageUploader::new(server.url("/upload").parse().unwrap()).unwrap();
        let err = uploader
            .upload(ImageFile::new("big.png", vec![0; 16]))
            .await
            .unwrap_err();

        assert!(
            matches!(err, UploadError::Status { status, ref body } if status == StatusCode::PAYLOAD_TOO_LARGE && body == "too large")
        );
    }

    #[tokio::test]
    async fn response_without_url_is_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(200).json_body(json!({ "location": "elsewhere" }));
        });

        let uploader = HttpImageUploader::new(server.url("/upload").parse().unwrap()).unwrap();
        let err = uploader
            .upload(ImageFile::new("a.png", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Decode(_)));
    }

    #[tokio::test]
    async fn unconfigured_uploader_rejects() {
        let err = HttpImageUploader::unconfigured()
            .upload(ImageFile::new("a.png", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
    }
}
