use axum::{
    extract::{Extension, Path, State},
    http::{StatusCode, Uri},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::{follow_service, user_service, ServiceError, UserProfile};
use crate::services::auth_service;
use crate::web::extract::{ValidJson, ValidQuery};
use crate::web::middleware::auth;
use crate::web::models::recipe_models::SubscriptionQuery;
use crate::web::models::{
    Actor, RegisterRequest, SetPasswordRequest, SubscriptionResponse, UserResponse,
};
use crate::web::pagination::{Page, PageParams, PaginationQuery};
use crate::web::{AppError, AppState};

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user =
        auth_service::register_user(&app_state.db_pool, payload, app_state.config.bcrypt_cost)
            .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    uri: Uri,
    ValidQuery(query): ValidQuery<PaginationQuery>,
) -> Result<Json<Page<UserProfile>>, AppError> {
    let params = PageParams::resolve(query.page, query.limit, app_state.config.page_size);
    let users = user_service::list_users(&app_state.db_pool).await?;
    let (count, page_users) = params.slice(users);
    let profiles = user_service::profiles(&app_state.db_pool, &actor, &page_users).await?;
    Ok(Json(Page::new(count, profiles, params, &uri)))
}

async fn me_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<UserProfile>, AppError> {
    let current = actor.require_user()?;
    let user = user_service::get_user_by_id(&app_state.db_pool, current.id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(Json(UserProfile::new(&user, false)))
}

async fn get_user_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserProfile>, AppError> {
    let user = user_service::get_user_by_id(&app_state.db_pool, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", user_id))?;
    let profile = user_service::profile(&app_state.db_pool, &actor, &user).await?;
    Ok(Json(profile))
}

async fn set_password_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let current = actor.require_user()?;
    auth_service::set_password(
        &app_state.db_pool,
        current.id,
        payload,
        app_state.config.bcrypt_cost,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriptions_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    uri: Uri,
    ValidQuery(query): ValidQuery<SubscriptionQuery>,
) -> Result<Json<Page<SubscriptionResponse>>, AppError> {
    let params = PageParams::resolve(query.page, query.limit, app_state.config.page_size);
    let authors = follow_service::followed_authors(&app_state.db_pool, &actor).await?;
    let (count, page_authors) = params.slice(authors);

    let mut results = Vec::with_capacity(page_authors.len());
    for author in page_authors {
        let followee =
            follow_service::describe_followee(&app_state.db_pool, author, query.recipes_limit)
                .await?;
        results.push(SubscriptionResponse::from(followee));
    }
    Ok(Json(Page::new(count, results, params, &uri)))
}

async fn subscribe_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(author_id): Path<i32>,
    ValidQuery(query): ValidQuery<SubscriptionQuery>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let author = follow_service::follow(&app_state.db_pool, &actor, author_id).await?;
    let followee =
        follow_service::describe_followee(&app_state.db_pool, author, query.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(followee))))
}

async fn unsubscribe_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(author_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    follow_service::unfollow(&app_state.db_pool, &actor, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_user_router() -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/api/users/me", get(me_handler))
        .route("/api/users/set_password", post(set_password_handler))
        .route("/api/users/subscriptions", get(subscriptions_handler))
        .route(
            "/api/users/{id}/subscribe",
            post(subscribe_handler).delete(unsubscribe_handler),
        )
        .route_layer(axum_middleware::from_fn(auth::require_user));

    Router::new()
        .route(
            "/api/users",
            get(list_users_handler).post(register_handler),
        )
        .route("/api/users/{id}", get(get_user_handler))
        .merge(protected)
}
