//! Single-image analysis route
//!
//! `POST /analyze` with a multipart `image` field. Each request stands
//! alone: the response is one EAR reading compared against the threshold,
//! never a multi-frame alert decision.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use camera_capture::VideoFrame;
use dms::{evaluate_single, SingleFrameVerdict};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// Body returned for a processed image
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Reading(EarReport),
    NoFace(NoFaceReport),
}

/// A face was found
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarReport {
    pub success: bool,
    pub ear: f32,
    pub is_eyes_closed: bool,
    pub details: EarDetails,
}

#[derive(Debug, Serialize)]
pub struct EarDetails {
    #[serde(rename = "leftEAR")]
    pub left_ear: f32,
    #[serde(rename = "rightEAR")]
    pub right_ear: f32,
    pub threshold: f32,
}

/// The model found nobody; not an error
#[derive(Debug, Serialize)]
pub struct NoFaceReport {
    pub success: bool,
    pub error: &'static str,
}

impl From<SingleFrameVerdict> for EarReport {
    fn from(v: SingleFrameVerdict) -> Self {
        Self {
            success: true,
            ear: v.ear,
            is_eyes_closed: v.is_eyes_closed,
            details: EarDetails {
                left_ear: v.left_ear,
                right_ear: v.right_ear,
                threshold: v.threshold,
            },
        }
    }
}

/// Analyze an uploaded image
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let result = run_analysis(&state, multipart).await;

    let outcome = match &result {
        Ok(AnalyzeResponse::Reading(_)) => "ok",
        Ok(AnalyzeResponse::NoFace(_)) => "no_face",
        Err(e) => e.kind(),
    };
    counter!("api_analyze_requests_total", "outcome" => outcome).increment(1);

    result.map(Json)
}

async fn run_analysis(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AnalyzeResponse, ApiError> {
    let landmarks = state.landmarks.clone().ok_or(ApiError::ModelNotReady)?;

    let mut multipart = multipart.map_err(|e| {
        debug!("Not a multipart upload: {}", e);
        ApiError::NoImage
    })?;
    let bytes = read_image_field(&mut multipart).await?.ok_or(ApiError::NoImage)?;

    let config = state.dms.clone();

    // Decoding and inference are CPU-bound; keep both off the async workers.
    let verdict = tokio::task::spawn_blocking(move || {
        let frame = VideoFrame::decode(&bytes).map_err(ApiError::Decode)?;
        evaluate_single(landmarks.as_ref(), &frame, &config).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Processing(e.to_string()))??;

    match verdict {
        Some(verdict) => {
            info!("Analyzed image. EAR: {:.3}, Drowsy: {}", verdict.ear, verdict.is_eyes_closed);
            Ok(AnalyzeResponse::Reading(verdict.into()))
        }
        None => {
            info!("No face detected in image");
            Ok(AnalyzeResponse::NoFace(NoFaceReport {
                success: false,
                error: "No face detected",
            }))
        }
    }
}

/// Bytes of the first `image` field; an empty file counts as missing
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<Bytes>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await?;
            return Ok((!bytes.is_empty()).then_some(bytes));
        }
    }
    Ok(None)
}
