use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::entities::tag;
use crate::db::services::{tag_service, ServiceError};
use crate::web::extract::ValidJson;
use crate::web::models::catalog_models::TagPayload;
use crate::web::models::Actor;
use crate::web::{AppError, AppState};

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<tag::Model>>, AppError> {
    let tags = tag_service::list_tags(&app_state.db_pool).await?;
    Ok(Json(tags))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<Json<tag::Model>, AppError> {
    let tag = tag_service::get_tag(&app_state.db_pool, tag_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tag", tag_id))?;
    Ok(Json(tag))
}

async fn create_tag_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<TagPayload>,
) -> Result<(StatusCode, Json<tag::Model>), AppError> {
    let tag = tag_service::create_tag(&app_state.db_pool, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    ValidJson(payload): ValidJson<TagPayload>,
) -> Result<Json<tag::Model>, AppError> {
    let tag = tag_service::update_tag(&app_state.db_pool, &actor, tag_id, payload).await?;
    Ok(Json(tag))
}

async fn delete_tag_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    tag_service::delete_tag(&app_state.db_pool, &actor, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_tag_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", get(list_tags_handler).post(create_tag_handler))
        .route(
            "/api/tags/{id}",
            get(get_tag_handler)
                .put(update_tag_handler)
                .patch(update_tag_handler)
                .delete(delete_tag_handler),
        )
}
