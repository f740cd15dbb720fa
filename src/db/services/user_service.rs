use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;

use crate::db::entities::user;
use crate::db::enums::UserRole;
use crate::db::services::error::{map_write_error, ServiceError};
use crate::db::services::follow_service;
use crate::services::policy::Actor;

/// Public view of a user as seen by `viewer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn new(user: &user::Model, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

// --- User Service Functions ---

/// Creates a new user. Email and username must both be unused.
pub async fn create_user(
    db: &DatabaseConnection,
    new_user: NewUser,
) -> Result<user::Model, ServiceError> {
    let clash = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(new_user.email.as_str()))
                .add(user::Column::Username.eq(new_user.username.as_str())),
        )
        .one(db)
        .await?;
    if let Some(existing) = clash {
        let field = if existing.email == new_user.email {
            "email"
        } else {
            "username"
        };
        return Err(ServiceError::AlreadyExists(format!(
            "A user with this {field} already exists."
        )));
    }

    user::ActiveModel {
        email: Set(new_user.email),
        username: Set(new_user.username),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        password_hash: Set(new_user.password_hash),
        role: Set(new_user.role),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_write_error(e, "A user with this email or username already exists."))
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

/// Retrieves a user by their email, which is also the login.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
}

pub async fn update_password_hash(
    db: &DatabaseConnection,
    user: user::Model,
    password_hash: String,
) -> Result<user::Model, DbErr> {
    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.update(db).await
}

/// Builds profiles for `users`, resolving `is_subscribed` with one query.
pub async fn profiles(
    db: &DatabaseConnection,
    viewer: &Actor,
    users: &[user::Model],
) -> Result<Vec<UserProfile>, DbErr> {
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let followed = match viewer.user_id() {
        Some(viewer_id) => follow_service::followed_among(db, viewer_id, &ids).await?,
        None => Default::default(),
    };
    Ok(users
        .iter()
        .map(|u| UserProfile::new(u, followed.contains(&u.id)))
        .collect())
}

pub async fn profile(
    db: &DatabaseConnection,
    viewer: &Actor,
    user: &user::Model,
) -> Result<UserProfile, DbErr> {
    let is_subscribed = match viewer.user_id() {
        Some(viewer_id) => follow_service::is_following(db, viewer_id, user.id).await?,
        None => false,
    };
    Ok(UserProfile::new(user, is_subscribed))
}
