//! Request failures and the display-only error log kept by each controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{status}: {detail}")]
    Status { status: u16, detail: String },

    /// A 2xx body that could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            detail: detail.into(),
        }
    }

    /// HTTP status for [`ApiError::Status`], `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One failure shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Controller operation that failed (e.g. `"fetch_project"`).
    pub operation: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Append-only list of failures. Nothing removes entries.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: &str, err: &ApiError) {
        tracing::warn!(operation, error = %err, "request failed");
        self.entries.push(ErrorRecord {
            operation: operation.to_string(),
            message: err.to_string(),
            at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[ErrorRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_uses_detail() {
        let err = ApiError::status(404, "Project not found");
        assert_eq!(err.to_string(), "404: Project not found");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_log_is_append_only() {
        let mut log = ErrorLog::new();
        log.record("fetch_info", &ApiError::Decode("eof".into()));
        log.record("fetch_project", &ApiError::status(500, "boom"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].operation, "fetch_info");
        assert_eq!(log.entries()[1].message, "500: boom");
    }
}
