//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vqa_core::{AnswerResult, ErrorCode, QaRecord, Session};

/// Response to a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
}

/// One question/answer pair in a session's history.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: AnswerResult,
    pub timestamp: DateTime<Utc>,
}

impl From<QaRecord> for HistoryEntry {
    fn from(record: QaRecord) -> Self {
        Self {
            question: record.question,
            answer: record.answer,
            timestamp: record.timestamp,
        }
    }
}

/// Session snapshot returned by `GET /session/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub image_released: bool,
    pub history: Vec<HistoryEntry>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            created_at: session.created_at,
            last_accessed_at: session.last_accessed_at,
            image_released: session.image_released(),
            history: session.history.into_iter().map(HistoryEntry::from).collect(),
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub active_sessions: usize,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error carrying an HTTP status and a stable error code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            response: ErrorResponse::new(msg, code.code()),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::InvalidRequest, msg)
    }

    /// Unknown, expired and malformed session ids all look the same.
    pub fn session_not_found() -> Self {
        Self::with_code(ErrorCode::SessionNotFound, "Session not found or expired")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Internal, msg)
    }

    pub fn validation(code: ErrorCode, errors: Vec<String>) -> Self {
        let mut err = Self::with_code(code, "Validation failed");
        err.response = err.response.with_details(errors);
        err
    }

    pub fn code(&self) -> &str {
        &self.response.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<vqa_core::Error> for ApiError {
    fn from(err: vqa_core::Error) -> Self {
        use vqa_core::Error;

        match &err {
            Error::SessionNotFound => ApiError::session_not_found(),
            Error::ImageReleased => ApiError::with_code(
                ErrorCode::ImageReleased,
                "Session image has been released; upload a new image",
            ),
            Error::Upload { code, message } => ApiError::with_code(*code, message),
            Error::ValidationWithCode { code, message } => {
                ApiError::validation(*code, vec![message.clone()])
            }
            // Storage and internal details stay in the logs.
            Error::Storage { .. } => {
                ApiError::with_code(ErrorCode::StorageFailed, "Failed to store upload")
            }
            Error::Inference(_) => {
                ApiError::with_code(ErrorCode::InferenceFailed, "Inference failed")
            }
            Error::Serialization(e) => {
                ApiError::bad_request(format!("Invalid request body: {}", e))
            }
            Error::Config(_) | Error::Internal(_) => ApiError::internal("Internal server error"),
        }
    }
}
