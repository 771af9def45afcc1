use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AccessDenied,
    Validation,
    CellNotFound,
    Internal,
}

/// An error as shown to the user: a stable code plus a display message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Errors attached to an action broadcast are produced by per-client access filtering.
    pub fn from_broadcast(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccessDenied, message)
    }
}
