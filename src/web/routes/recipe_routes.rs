use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::shopping_cart_service::{self, SHOPPING_LIST_FILENAME};
use crate::db::services::{favorite_service, RecipeFilter, RecipeShort, RecipeView};
use crate::web::extract::{ValidJson, ValidQuery};
use crate::web::models::recipe_models::{RecipeListQuery, RecipePayload};
use crate::web::models::Actor;
use crate::web::pagination::{Page, PageParams};
use crate::web::{AppError, AppState};

async fn list_recipes_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    uri: Uri,
    ValidQuery(query): ValidQuery<RecipeListQuery>,
) -> Result<Json<Page<RecipeView>>, AppError> {
    let service = &app_state.recipe_service;
    let filter = RecipeFilter {
        author: query.author,
        tags: query.tags,
        is_favorited: query.is_favorited,
        is_in_shopping_cart: query.is_in_shopping_cart,
    };
    let params = PageParams::resolve(query.page, query.limit, app_state.config.page_size);

    let recipes = service.list_recipes(&actor, &filter).await?;
    let (count, page_recipes) = params.slice(recipes);
    let aggregates = service.load_aggregates(page_recipes).await?;
    let views = service.describe(&actor, aggregates).await?;
    Ok(Json(Page::new(count, views, params, &uri)))
}

async fn get_recipe_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeView>, AppError> {
    let service = &app_state.recipe_service;
    let aggregate = service.get_recipe(recipe_id).await?;
    Ok(Json(service.describe_one(&actor, aggregate).await?))
}

async fn create_recipe_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeView>), AppError> {
    let service = &app_state.recipe_service;
    let aggregate = service.create_recipe(&actor, payload).await?;
    let view = service.describe_one(&actor, aggregate).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_recipe_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    ValidJson(payload): ValidJson<RecipePayload>,
) -> Result<Json<RecipeView>, AppError> {
    let service = &app_state.recipe_service;
    let aggregate = service.update_recipe(&actor, recipe_id, payload).await?;
    Ok(Json(service.describe_one(&actor, aggregate).await?))
}

async fn delete_recipe_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    app_state
        .recipe_service
        .delete_recipe(&actor, recipe_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_favorite_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    let short = favorite_service::add_favorite(&app_state.db_pool, &actor, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

async fn remove_favorite_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    favorite_service::remove_favorite(&app_state.db_pool, &actor, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_cart_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    let short = shopping_cart_service::add_to_cart(&app_state.db_pool, &actor, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

async fn remove_from_cart_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    shopping_cart_service::remove_from_cart(&app_state.db_pool, &actor, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let user = actor.require_user()?;
    let items = shopping_cart_service::build_shopping_list(&app_state.db_pool, user.id).await?;
    let body = shopping_cart_service::render_shopping_list(&items);

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{SHOPPING_LIST_FILENAME}\""
    ))
    .map_err(|e| AppError::InternalServerError(format!("Invalid header value: {e}")))?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub fn create_recipe_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/recipes",
            get(list_recipes_handler).post(create_recipe_handler),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(download_shopping_cart_handler),
        )
        .route(
            "/api/recipes/{id}",
            get(get_recipe_handler)
                .put(update_recipe_handler)
                .patch(update_recipe_handler)
                .delete(delete_recipe_handler),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(add_favorite_handler).delete(remove_favorite_handler),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(add_to_cart_handler).delete(remove_from_cart_handler),
        )
}
