//! Image generation endpoint
//!
//! POST /api/generate - prompt plus optional reference images

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiJson, AppState};
use crate::image::{ImageDataUrl, ImageRef};

/// Build the generation router
pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate))
}

/// Generation request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Generation response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub image: ImageRef,
    pub prompt: String,
    /// Echo of the uploaded references, for client-side history
    pub input_images: Vec<ImageDataUrl>,
    pub timestamp: DateTime<Utc>,
}

async fn generate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let images = req.images.unwrap_or_default();
    let output = state.generator.generate(&req.prompt, &images).await?;

    Ok(Json(GenerateResponse {
        success: true,
        image: output.image,
        prompt: output.prompt,
        input_images: output.input_images,
        timestamp: Utc::now(),
    }))
}
