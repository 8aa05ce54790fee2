//! Gallery endpoints
//!
//! GET    /api/gallery      - list entries (no delete tokens)
//! POST   /api/gallery      - publish, returns the delete token once
//! DELETE /api/gallery/{id} - delete with the entry's token

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, ApiJson, AppState, ErrorResponse};
use crate::gallery::{PublicEntry, PublishedEntry, RemoveOutcome};

/// Header carrying the delete token
pub const DELETE_TOKEN_HEADER: &str = "x-delete-token";

/// Build the gallery router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gallery", get(list).post(publish))
        .route("/gallery/{id}", delete(remove))
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub items: Vec<PublicEntry>,
}

async fn list(State(state): State<AppState>) -> Json<ListResponse> {
    Json(ListResponse {
        success: true,
        items: state.gallery.list_public().await,
    })
}

/// Publish request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub input_images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    #[serde(flatten)]
    pub published: PublishedEntry,
}

async fn publish(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PublishRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let refs = req.input_images.unwrap_or_default();
    let published = state.gallery.publish(&req.prompt, &req.image, &refs).await?;

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            success: true,
            published,
        }),
    ))
}

/// Optional delete body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub delete_token: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Token from the header, else from a JSON body
fn delete_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if let Some(token) = headers
        .get(DELETE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(token.to_string());
    }
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<DeleteRequest>(body)
        .ok()
        .map(|r| r.delete_token)
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let token = delete_token(&headers, &body).unwrap_or_default();

    match state.gallery.delete(&id, &token).await? {
        RemoveOutcome::Removed => Ok(Json(DeleteResponse {
            success: true,
            message: "deleted".to_string(),
        })
        .into_response()),
        outcome => {
            // Missing and not-owned look the same to the caller
            info!("Gallery delete of {} refused: {:?}", id, outcome);
            Ok((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    "gallery item not found or delete token invalid",
                )),
            )
                .into_response())
        }
    }
}
