use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::extract::ValidJson;
use crate::web::middleware::auth::{self, TOKEN_COOKIE};
use crate::web::models::LoginRequest;
use crate::web::{AppError, AppState};

fn cookie_header(cookie: Cookie<'_>) -> Result<HeaderValue, AppError> {
    cookie
        .to_string()
        .parse()
        .map_err(|e| AppError::InternalServerError(format!("Invalid cookie header: {e}")))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Response, AppError> {
    let token = auth_service::login_user(
        &app_state.db_pool,
        payload,
        &app_state.config.jwt_secret,
        app_state.config.token_ttl_hours,
    )
    .await?;

    let auth_cookie = Cookie::build((TOKEN_COOKIE, token.auth_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.config.secure_cookies)
        .build();

    let mut response = Json(token).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cookie_header(auth_cookie)?);
    Ok(response)
}

/// Tokens are stateless; logging out only clears the cookie.
async fn logout_handler() -> Result<Response, AppError> {
    let mut expired = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    expired.make_removal();
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cookie_header(expired)?);
    Ok(response)
}

pub fn create_auth_router() -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/api/auth/token/logout", post(logout_handler))
        .route_layer(axum_middleware::from_fn(auth::require_user));

    Router::new()
        .route("/api/auth/token/login", post(login_handler))
        .merge(protected)
}
