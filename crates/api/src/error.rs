//! API error types

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use camera_capture::CameraError;
use dms::DmsError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// No landmark model loaded; not retried
    #[error("Model not initialized yet")]
    ModelNotReady,

    #[error("No image file provided")]
    NoImage,

    #[error("Failed to decode image")]
    Decode(#[source] CameraError),

    #[error("Failed to read upload")]
    Upload { status: StatusCode, message: String },

    /// Model or worker failure while analyzing an accepted image
    #[error("Failed to process image")]
    Processing(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NoImage | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload { status, .. } => *status,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::ModelNotReady => "model_not_ready",
            ApiError::NoImage => "no_image",
            ApiError::Decode(_) => "decode_failed",
            ApiError::Upload { .. } => "upload_failed",
            ApiError::Processing(_) => "processing_failed",
        }
    }
}

impl From<DmsError> for ApiError {
    fn from(e: DmsError) -> Self {
        ApiError::Processing(e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Upload {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Decode(source) => {
                warn!("Rejected upload: {}", source);
                json!({ "error": self.to_string(), "details": source.to_string() })
            }
            ApiError::Upload { message, .. } => {
                warn!("Rejected upload: {}", message);
                json!({ "error": self.to_string(), "details": message })
            }
            ApiError::Processing(details) => {
                error!("Error processing image: {}", details);
                json!({ "error": self.to_string(), "details": details })
            }
            ApiError::ModelNotReady | ApiError::NoImage => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::ModelNotReady.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::NoImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Decode(CameraError::Format("empty".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DmsError::Inference("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_processing_keeps_details() {
        let err = ApiError::from(DmsError::Inference("boom".into()));
        assert_eq!(err.to_string(), "Failed to process image");
        assert!(matches!(err, ApiError::Processing(ref d) if d.contains("boom")));
    }
}
