//! HTTP error mapping: every failure leaves the API as a JSON envelope
//! with a stable machine-readable code.

use crate::error::EngineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Engine(err) => match err {
                EngineError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                EngineError::UnknownDigest(_) => StatusCode::NOT_FOUND,
                EngineError::Extract(_) | EngineError::Codec(_) => StatusCode::BAD_REQUEST,
                EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Engine(err) => match err {
                EngineError::TooLarge { .. } => "upload_too_large",
                EngineError::UnknownDigest(_) => "unknown_digest",
                EngineError::Extract(_) => "unextractable_content",
                EngineError::Codec(_) => "unfingerprintable_content",
                EngineError::Store(_) => "storage_failure",
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
