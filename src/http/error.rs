use thiserror::Error;

/// Machine-readable classification of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Timeout,
    Connect,
    InvalidRequest,
    Body,
}

/// Error raised by an [`HttpClient`](super::HttpClient) when a request
/// cannot be completed. Carried per-request by the runner; it never aborts
/// a collection run.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl RequestError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(ErrorCode::InvalidRequest),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self {
                message: format!("Request timed out: {err}"),
                code: Some(ErrorCode::Timeout),
            }
        } else if err.is_connect() {
            Self {
                message: format!("Connection failed: {err}"),
                code: Some(ErrorCode::Connect),
            }
        } else if err.is_body() || err.is_decode() {
            Self {
                message: format!("Failed to read response: {err}"),
                code: Some(ErrorCode::Body),
            }
        } else {
            Self {
                message: format!("Request failed: {err}"),
                code: None,
            }
        }
    }
}
