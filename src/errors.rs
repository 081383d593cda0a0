use crate::{pipeline::error::PipelineError, services::video_service::RecordError};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        // the request body broke off mid-stream; keep the client-facing status
        if let PipelineError::StagingFailed(io_err) = &err {
            if let Some(multipart) = multipart_source(io_err) {
                return AppError::new(multipart.status(), multipart.body_text());
            }
        }

        match &err {
            PipelineError::UnsupportedMediaType(_) => {
                AppError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
            }
            PipelineError::TooLarge { .. } => {
                AppError::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            PipelineError::NoStreamFound | PipelineError::InvalidDimensions { .. } => {
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            PipelineError::Timeout { .. } => {
                tracing::error!("Video processing timed out: {}", err);
                AppError::new(StatusCode::GATEWAY_TIMEOUT, "video processing timed out")
            }
            // tool diagnostics and io details stay in the log
            PipelineError::StagingFailed(_)
            | PipelineError::ProbeFailed(_)
            | PipelineError::RemuxFailed(_)
            | PipelineError::EmptyOutput
            | PipelineError::UploadFailed(_) => {
                tracing::error!("Encountered internal server error: {}", err);
                AppError::internal("failed to process video")
            }
        }
    }
}

fn multipart_source(err: &std::io::Error) -> Option<&MultipartError> {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::VideoNotFound(_) => AppError::not_found(err.to_string()),
            RecordError::EmptyTitle => AppError::bad_request(err.to_string()),
            RecordError::Sqlx(_) => {
                tracing::error!("Encountered internal server error: {}", err);
                AppError::internal("database error")
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}
