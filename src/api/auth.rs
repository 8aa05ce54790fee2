//! Site session endpoints and the session gate
//!
//! One shared password unlocks the site. A successful login sets an
//! `auth_token` cookie holding a token derived from the password.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiJson, AppState, ErrorResponse};
use crate::auth::{session_token, tokens_match, SESSION_COOKIE};

/// Session lifetime
const SESSION_DAYS: i64 = 30;

/// Build auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check-auth", get(check_auth))
}

fn has_session(state: &AppState, jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE)
        .is_some_and(|c| tokens_match(c.value(), &state.session_token))
}

/// Reject requests without a valid session cookie
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if has_session(&state, &jar) {
        return next.run(request).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            success: false,
            error: Some("Unauthorized"),
            message: "please log in first".to_string(),
        }),
    )
        .into_response()
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: Option<String>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Log in with the site password
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Response {
    let Some(password) = req.password.filter(|p| !p.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("password is required")),
        )
            .into_response();
    };

    if !tokens_match(&session_token(&password), &state.session_token) {
        warn!("Login rejected: wrong password");
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("wrong password")),
        )
            .into_response();
    }

    let cookie = Cookie::build((SESSION_COOKIE, state.session_token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(SESSION_DAYS));

    info!("User logged in");

    (
        jar.add(cookie),
        Json(MessageResponse {
            success: true,
            message: "logged in".to_string(),
        }),
    )
        .into_response()
}

/// Log out by clearing the session cookie
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            success: true,
            message: "logged out".to_string(),
        }),
    )
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
}

/// Report whether the caller holds a valid session
async fn check_auth(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    Json(CheckAuthResponse {
        authenticated: has_session(&state, &jar),
    })
}
