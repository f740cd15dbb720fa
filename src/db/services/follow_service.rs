use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::info;

use crate::db::entities::{follow, recipe, user};
use crate::db::services::error::{is_unique_violation, map_write_error, ServiceError};
use crate::services::policy::Actor;

/// An author the caller follows, with a preview of their recipes.
#[derive(Debug, Clone)]
pub struct Followee {
    pub author: user::Model,
    pub recipes_count: u64,
    pub recipes: Vec<recipe::Model>,
}

pub async fn is_following(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follow::Entity::find_by_id((user_id, author_id))
        .one(db)
        .await?
        .is_some())
}

/// Which of `author_ids` `user_id` follows.
pub async fn followed_among(
    db: &DatabaseConnection,
    user_id: i32,
    author_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows = follow::Entity::find()
        .filter(follow::Column::UserId.eq(user_id))
        .filter(follow::Column::AuthorId.is_in(author_ids.iter().copied()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|f| f.author_id).collect())
}

/// Subscribes the caller to `author_id`.
pub async fn follow(
    db: &DatabaseConnection,
    actor: &Actor,
    author_id: i32,
) -> Result<user::Model, ServiceError> {
    let user = actor.require_user()?;
    if user.id == author_id {
        return Err(ServiceError::SelfFollow);
    }
    let author = user::Entity::find_by_id(author_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", author_id))?;
    if is_following(db, user.id, author_id).await? {
        return Err(ServiceError::AlreadyFollowing);
    }

    let relation = follow::ActiveModel {
        user_id: Set(user.id),
        author_id: Set(author_id),
        created_at: Set(Utc::now()),
    };
    follow::Entity::insert(relation)
        .exec_without_returning(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::AlreadyFollowing
            } else {
                map_write_error(e, "You already follow this author.")
            }
        })?;
    info!(user_id = user.id, author_id, "Subscription created.");
    Ok(author)
}

/// Removes the subscription; fails with `NotFollowing` when there is none.
pub async fn unfollow(
    db: &DatabaseConnection,
    actor: &Actor,
    author_id: i32,
) -> Result<(), ServiceError> {
    let user = actor.require_user()?;
    user::Entity::find_by_id(author_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", author_id))?;

    let result = follow::Entity::delete_by_id((user.id, author_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFollowing);
    }
    info!(user_id = user.id, author_id, "Subscription removed.");
    Ok(())
}

/// Authors the caller follows, most recent subscription first.
pub async fn followed_authors(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<user::Model>, ServiceError> {
    let user = actor.require_user()?;
    let relations = follow::Entity::find()
        .filter(follow::Column::UserId.eq(user.id))
        .order_by_desc(follow::Column::CreatedAt)
        .all(db)
        .await?;
    let ids: Vec<i32> = relations.iter().map(|f| f.author_id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_id: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    Ok(ids.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}

/// Recipe count and the newest `recipe_limit` recipes of `author`
/// (all of them when no limit is given).
pub async fn describe_followee(
    db: &DatabaseConnection,
    author: user::Model,
    recipe_limit: Option<u64>,
) -> Result<Followee, DbErr> {
    let recipes_count = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author.id))
        .count(db)
        .await?;

    let mut query = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author.id))
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id);
    if let Some(limit) = recipe_limit {
        query = query.limit(limit);
    }
    let recipes = query.all(db).await?;

    Ok(Followee {
        author,
        recipes_count,
        recipes,
    })
}
