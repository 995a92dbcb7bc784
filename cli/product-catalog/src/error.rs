//! Error handling for product API operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Longest response body excerpt included in error messages.
const BODY_EXCERPT_LEN: usize = 200;

/// Errors of a single request against the product API.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("invalid request url")]
    InvalidUrl(#[source] url::ParseError),
    #[error("could not reach the product API")]
    Transport(#[source] reqwest::Error),
    #[error("{status}: {}", excerpt(.body))]
    Status { status: StatusCode, body: String },
    #[error("could not decode response from the product API")]
    Decode(#[source] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    /// The HTTP status of a rejected request, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CatalogClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the request on a uniqueness constraint.
    ///
    /// The API reports constraint violations only in the free-form body,
    /// e.g. `duplicate key value violates unique constraint "product_title"`.
    pub fn is_unique_violation(&self) -> bool {
        let CatalogClientError::Status { body, .. } = self else {
            return false;
        };
        let body = body.to_lowercase();
        ["unique constraint", "duplicate key", "already exists"]
            .iter()
            .any(|signal| body.contains(signal))
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "response body empty".to_string();
    }
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
