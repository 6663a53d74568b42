//! Errors returned by the REST client

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// Salesforce answered with a non-success status
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// Turn a Salesforce error body (`[{"message": .., "errorCode": ..}]`) into a readable message
pub fn error_message(body: &str) -> Option<String> {
    let errors: Vec<ErrorBody> = serde_json::from_str(body).ok()?;
    let messages: Vec<String> = errors
        .into_iter()
        .map(|e| match e.error_code {
            Some(code) => format!("{}: {}", code, e.message),
            None => e.message,
        })
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
