// Error taxonomy for the public API, plus the workspace-level error type.
//
// Expected failures travel as `ApiError` with a closed `ErrorCode`; each
// code owns its HTTP status. Infrastructure faults (store unreachable,
// serialization bugs) travel as the non-API variants and surface as 500.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of expected-failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    Conflict,
    Unauthorized,
    NotFound,
    Forbidden,
    Internal,
}

impl ErrorCode {
    /// The HTTP status this category maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidInput => "Invalid input",
            Self::Conflict => "Conflict",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "Not found",
            Self::Forbidden => "Forbidden",
            Self::Internal => "Internal server error",
        };
        write!(f, "{msg}")
    }
}

/// An expected failure with a user-facing message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
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

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// The `{success, message}` body every endpoint returns on failure.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "message": self.message,
        })
    }
}

/// Workspace-level error: expected API failures plus infrastructure faults.
#[derive(Debug, thiserror::Error)]
pub enum PitchdeskError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PitchdeskError {
    /// Shortcut for wrapping a storage backend failure.
    pub fn database(err: impl fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    /// The API error inside, if this is an expected failure.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }
}

/// Unified result type for pitchdesk operations.
pub type Result<T> = std::result::Result<T, PitchdeskError>;
