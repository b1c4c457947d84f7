//! Unified error types for the VQA backend.
//!
//! Error codes:
//! - SESSION_001-002: Session lookup errors
//! - UPLOAD_001-003: Upload errors
//! - VALID_001-002: Request validation errors
//! - STORAGE_001: Upload directory errors
//! - INFER_001: Inference errors
//! - INTERNAL_001: Everything else

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes surfaced to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// SESSION_001: Unknown or expired session
    SessionNotFound,
    /// SESSION_002: Session image was released by `complete`
    ImageReleased,
    /// UPLOAD_001: Uploaded file is not an image
    NotAnImage,
    /// UPLOAD_002: Uploaded file exceeds the size cap
    UploadTooLarge,
    /// UPLOAD_003: Multipart body has no file field
    MissingFile,
    /// VALID_001: Malformed request
    InvalidRequest,
    /// VALID_002: Question is empty or too long
    InvalidQuestion,
    /// STORAGE_001: Upload could not be persisted
    StorageFailed,
    /// INFER_001: Inference engine failed
    InferenceFailed,
    /// INTERNAL_001: Unexpected failure
    Internal,
}

impl ErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SESSION_001",
            Self::ImageReleased => "SESSION_002",
            Self::NotAnImage => "UPLOAD_001",
            Self::UploadTooLarge => "UPLOAD_002",
            Self::MissingFile => "UPLOAD_003",
            Self::InvalidRequest => "VALID_001",
            Self::InvalidQuestion => "VALID_002",
            Self::StorageFailed => "STORAGE_001",
            Self::InferenceFailed => "INFER_001",
            Self::Internal => "INTERNAL_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::SessionNotFound => 404,
            Self::ImageReleased => 409,
            Self::NotAnImage => 400,
            Self::UploadTooLarge => 413,
            Self::MissingFile => 400,
            Self::InvalidRequest => 400,
            Self::InvalidQuestion => 400,
            Self::StorageFailed => 500,
            Self::InferenceFailed => 502,
            Self::Internal => 500,
        }
    }
}

/// Unified error type for the VQA backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown and expired sessions are deliberately indistinguishable.
    #[error("session not found or expired")]
    SessionNotFound,

    #[error("session image has already been released")]
    ImageReleased,

    /// Upload rejected before anything was written.
    #[error("[{}] {message}", .code.code())]
    Upload { code: ErrorCode, message: String },

    /// Request validation error with code.
    #[error("[{}] {message}", .code.code())]
    ValidationWithCode { code: ErrorCode, message: String },

    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("inference error: {0}")]
    Inference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an upload rejection.
    pub fn upload(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::Upload {
            code,
            message: msg.into(),
        }
    }

    /// Create a validation error with code.
    pub fn validation(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code,
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            message: msg.into(),
            source,
        }
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SessionNotFound => ErrorCode::SessionNotFound,
            Self::ImageReleased => ErrorCode::ImageReleased,
            Self::Upload { code, .. } => *code,
            Self::ValidationWithCode { code, .. } => *code,
            Self::Storage { .. } => ErrorCode::StorageFailed,
            Self::Inference(_) => ErrorCode::InferenceFailed,
            Self::Serialization(_) => ErrorCode::InvalidRequest,
            Self::Config(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound)
    }
}
