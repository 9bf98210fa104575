use crate::{
    models::reference::ReferenceError,
    services::{
        auth::AuthError, faststart::RemuxError, object_storage::ObjectStoreError,
        prober::ProbeError, uploader::UploadError, video_store::StoreError,
    },
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, io};
use thiserror::Error;
use uuid::Uuid;

/// Failures of the ingest pipelines and read paths. Every variant is
/// terminal for the request that produced it.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("user is not the owner of video `{0}`")]
    Forbidden(Uuid),
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("unsupported media type `{0}`")]
    UnsupportedMediaType(String),
    #[error("failed to probe video: {0}")]
    Probe(#[from] ProbeError),
    #[error("failed to rewrite video for fast start: {0}")]
    Remux(#[from] RemuxError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("stored video reference is corrupt: {0}")]
    InvalidReference(#[from] ReferenceError),
    #[error("failed to sign playback url: {0}")]
    Signing(#[source] ObjectStoreError),
    #[error("metadata store error: {0}")]
    Store(#[source] sqlx::Error),
    #[error("local i/o error: {0}")]
    Io(#[from] io::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VideoNotFound(id) => ServiceError::NotFound(id),
            StoreError::Sqlx(err) => ServiceError::Store(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

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

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = ?err, "request failed: {err}");
            let message = match err {
                ServiceError::Probe(_) | ServiceError::Remux(_) => "Failed to process video",
                ServiceError::Upload(_) => "Failed to upload video",
                ServiceError::InvalidReference(_) | ServiceError::Signing(_) => {
                    "Failed to generate playback url"
                }
                _ => "Internal server error",
            };
            return AppError::internal(message);
        }

        tracing::debug!(status = status.as_u16(), "request rejected: {err}");
        AppError::new(status, err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        ServiceError::from(err).into()
    }
}
