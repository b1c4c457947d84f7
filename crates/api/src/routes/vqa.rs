//! Visual question answering endpoints.
//!
//! 1. `POST /upload` stores an image and opens a session
//! 2. `POST /ask` answers a question about the session's image
//! 3. `GET /session/:id` returns the session and its history
//! 4. `POST /session/:id/complete` releases the image, keeps the history
//! 5. `DELETE /session/:id` drops the session entirely

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, info, warn};
use validator::Validate;
use vqa_core::{AnswerResult, Error, ErrorCode};

use crate::extractors::SessionId;
use crate::response::{ApiError, MessageResponse, SessionResponse, UploadResponse};
use crate::state::AppState;

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AskRequest {
    pub session_id: String,
    #[validate(length(min = 1, max = 512, message = "question must be 1 to 512 characters"))]
    pub question: String,
}

impl AskRequest {
    /// Trims the question so whitespace-only input fails validation.
    pub fn normalized(mut self) -> Self {
        self.question = self.question.trim().to_string();
        self
    }
}

struct ImageUpload {
    filename: String,
    bytes: Bytes,
}

/// POST /upload - Store an image and open a session for it.
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    metrics().uploads_received.inc();

    let upload = read_image(multipart, state.max_upload_bytes)
        .await
        .inspect_err(|e| {
            metrics().uploads_rejected.inc();
            warn!(code = %e.code(), reason = %e.response.error, "Upload rejected");
        })?;

    debug!(
        filename = %upload.filename,
        size = upload.bytes.len(),
        "Received upload"
    );

    // Writing the file is blocking I/O.
    let sessions = state.sessions.clone();
    let session_id =
        tokio::task::spawn_blocking(move || sessions.create(&upload.bytes, &upload.filename))
            .await
            .map_err(|e| {
                error!(error = %e, "Upload task failed");
                ApiError::internal("Failed to store upload")
            })??;

    Ok(Json(UploadResponse { session_id }))
}

/// POST /ask - Answer a question about a session's image.
///
/// A failed prediction leaves the session history untouched. If the session
/// went away meanwhile, the answer is the same as asking about it afterwards.
pub async fn ask_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnswerResult>, ApiError> {
    let request: AskRequest = serde_json::from_slice::<AskRequest>(&body)
        .map_err(Error::from)?
        .normalized();

    request
        .validate()
        .map_err(|e| ApiError::validation(ErrorCode::InvalidQuestion, vec![e.to_string()]))?;

    let SessionId(id) = SessionId::parse(&request.session_id)?;
    metrics().questions_received.inc();

    let session = state.sessions.get(&id)?;
    let image = session.image_path.ok_or(Error::ImageReleased)?;

    let start = Instant::now();
    let answer = match state.engine.predict(&image, &request.question).await {
        Ok(answer) => answer,
        Err(e) => {
            // A reset or complete during inference takes the image away.
            let session = state.sessions.get(&id)?;
            if session.image_released() {
                return Err(Error::ImageReleased.into());
            }
            metrics().inference_errors.inc();
            error!(session_id = %id, error = %e, "Inference failed");
            return Err(e.into());
        }
    };
    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().inference_latency_ms.observe(latency_ms);

    state
        .sessions
        .record_answer(&id, request.question, answer.clone())?;

    info!(
        session_id = %id,
        answer = %answer.answer,
        is_answerable = answer.is_answerable,
        latency_ms = latency_ms,
        "Question answered"
    );

    Ok(Json(answer))
}

/// GET /session/:session_id - Session snapshot with history.
pub async fn get_session_handler(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.sessions.get(&id)?;
    Ok(Json(SessionResponse::from(session)))
}

/// POST /session/:session_id/complete - Release the image, keep the history.
pub async fn complete_handler(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.complete(&id)?;
    Ok(Json(MessageResponse::new(
        "Session completed successfully, resources cleaned up",
    )))
}

/// DELETE /session/:session_id - Drop the session and its image.
pub async fn reset_handler(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.remove(&id)?;
    Ok(Json(MessageResponse::new("Session reset successfully")))
}

/// Pulls the `file` field out of the multipart body.
async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
    max_bytes: usize,
) -> Result<ImageUpload, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(ApiError::with_code(
                ErrorCode::NotAnImage,
                "File must be an image",
            ));
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        return Ok(ImageUpload { filename, bytes });
    }

    Err(ApiError::with_code(
        ErrorCode::MissingFile,
        "Multipart field 'file' is required",
    ))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::with_code(ErrorCode::UploadTooLarge, "Upload exceeds size limit")
    } else {
        ApiError::bad_request(err.body_text())
    }
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::with_code(
        ErrorCode::UploadTooLarge,
        format!("Image exceeds {}KB limit", max_bytes / 1024),
    )
}
