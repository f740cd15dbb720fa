use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::services::user_service;
use crate::services::auth_service;
use crate::web::models::{Actor, AuthenticatedUser};
use crate::web::{error::AppError, AppState};

pub const TOKEN_COOKIE: &str = "token";

/// Token from `Authorization: Bearer <t>` or `Authorization: Token <t>`,
/// falling back to the `token` cookie.
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("Token "))
        })
        .map(|token| token.trim().to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

/// Resolves the caller into an [`Actor`] request extension. Requests without
/// a token continue as anonymous; a token that fails to verify, or whose user
/// no longer exists, is rejected with 401.
pub async fn resolve_actor(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let actor = match extract_token(req.headers(), &jar) {
        None => Actor::Anonymous,
        Some(token) => {
            let claims = auth_service::decode_token(&token, &state.config.jwt_secret)?;
            let user = user_service::get_user_by_id(&state.db_pool, claims.user_id)
                .await?
                .ok_or_else(|| {
                    warn!(user_id = claims.user_id, "Token refers to a deleted user.");
                    AppError::InvalidCredentials
                })?;
            debug!(user_id = user.id, "Request authenticated.");
            Actor::User(AuthenticatedUser {
                id: user.id,
                email: user.email,
                role: user.role,
            })
        }
    };
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// Route layer for endpoints that never serve anonymous callers.
pub async fn require_user(req: Request<AxumBody>, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<Actor>() {
        Some(Actor::User(_)) => Ok(next.run(req).await),
        _ => Err(AppError::Unauthorized(
            "Authentication credentials were not provided.".to_string(),
        )),
    }
}
