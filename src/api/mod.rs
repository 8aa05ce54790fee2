//! HTTP API module - JSON endpoints under `/api`

mod auth;
mod gallery;
mod generate;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::error::GatewayError;
use crate::gallery::GalleryService;
use crate::generate::Generator;
use crate::upstream::{HttpUpstream, UpstreamClient};

pub use auth::require_session;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generator: Arc<Generator>,
    pub gallery: Arc<GalleryService>,
    /// Expected session cookie value
    pub session_token: Arc<str>,
}

impl AppState {
    /// Build state with the HTTP upstream client
    pub async fn new(config: Config) -> Result<Self, GatewayError> {
        let upstream = Arc::new(HttpUpstream::new(&config)?);
        Self::with_upstream(config, upstream).await
    }

    /// Build state around any upstream implementation
    pub async fn with_upstream(
        config: Config,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Result<Self, GatewayError> {
        let gallery = GalleryService::open(&config).await?;
        let generator = Generator::new(upstream, &config);
        let session_token = crate::auth::session_token(config.password());

        Ok(Self {
            config: Arc::new(config),
            generator: Arc::new(generator),
            gallery: Arc::new(gallery),
            session_token: session_token.into(),
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .merge(generate::router())
        .merge(gallery::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let api = Router::new()
        .route("/health", get(health_check))
        .merge(auth::router())
        .merge(gated)
        .fallback(not_found);

    let router = Router::new().nest("/api", api);

    let router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(root)).fallback(not_found),
    };

    router
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Failure body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: None,
            message: message.into(),
        }
    }
}

/// Error wrapper mapping [`GatewayError`] to client-safe responses
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            GatewayError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "image generation failed, please try again later".to_string(),
            ),
            GatewayError::Extraction { .. } => (
                StatusCode::BAD_GATEWAY,
                "the generation service returned no usable image".to_string(),
            ),
            GatewayError::Storage(detail) => {
                error!("Gallery storage failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// JSON body extractor that rejects with the shared error body
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(GatewayError::Validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// Unknown endpoint
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("endpoint not found")),
    )
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "bananad",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now(),
        model: state.generator.model_name().to_string(),
        max_images: state.config.max_images,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    model: String,
    max_images: usize,
}
