use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Payload problems detected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one ingredient is required.")]
    EmptyIngredientList,
    #[error("Ingredient {0} is listed more than once.")]
    DuplicateIngredient(i32),
    #[error("Amount of ingredient {ingredient_id} must be at least 1, got {amount}.")]
    InvalidAmount { ingredient_id: i32, amount: i32 },
    #[error("At least one tag is required.")]
    EmptyTagList,
    #[error("Tag {0} is listed more than once.")]
    DuplicateTag(i32),
    #[error("Tag {0} does not exist.")]
    UnknownTag(i32),
    #[error("Cooking time must be between 1 and {max} minutes, got {value}.")]
    InvalidCookingTime { value: i32, max: i32 },
    #[error("Recipe name must be between 1 and {max} characters.")]
    InvalidName { max: usize },
    #[error("Recipe text must not be empty.")]
    EmptyText,
    #[error("An image is required.")]
    MissingImage,
    #[error("'{0}' is not a hex color.")]
    InvalidColor(String),
    #[error("'{0}' is not a valid slug.")]
    InvalidSlug(String),
    #[error("{message}")]
    InvalidField { field: &'static str, message: String },
}

impl ValidationError {
    /// Name of the payload field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyIngredientList
            | ValidationError::DuplicateIngredient(_) => "ingredients",
            ValidationError::InvalidAmount { .. } => "amount",
            ValidationError::EmptyTagList
            | ValidationError::DuplicateTag(_)
            | ValidationError::UnknownTag(_) => "tags",
            ValidationError::InvalidCookingTime { .. } => "cooking_time",
            ValidationError::InvalidName { .. } => "name",
            ValidationError::EmptyText => "text",
            ValidationError::MissingImage => "image",
            ValidationError::InvalidColor(_) => "color",
            ValidationError::InvalidSlug(_) => "slug",
            ValidationError::InvalidField { field, .. } => *field,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Conflict(String),
    #[error("You cannot follow yourself.")]
    SelfFollow,
    #[error("You already follow this author.")]
    AlreadyFollowing,
    #[error("You do not follow this author.")]
    NotFollowing,
    #[error("{0}")]
    NotFound(String),
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("Authentication credentials were not provided.")]
    Unauthenticated,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ServiceError {
    pub fn not_found(what: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{what} {id} not found."))
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Maps constraint failures raised while writing into the domain error the
/// caller would have received had the pre-check caught it.
pub(crate) fn map_write_error(err: DbErr, on_duplicate: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::AlreadyExists(on_duplicate.to_string())
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            ServiceError::Conflict("A referenced record no longer exists.".to_string())
        }
        _ => ServiceError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{
        ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set,
    };

    use super::*;
    use crate::db::entities::{favorite, recipe, user};
    use crate::db::enums::UserRole;
    use crate::db::schema::create_schema;

    async fn seeded_db() -> (DatabaseConnection, i32, i32) {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        create_schema(&db).await.unwrap();
        let author = user::ActiveModel {
            email: Set("cook@example.com".to_string()),
            username: Set("cook".to_string()),
            first_name: Set("Cook".to_string()),
            last_name: Set("Book".to_string()),
            password_hash: Set("x".to_string()),
            role: Set(UserRole::User),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let recipe = recipe::ActiveModel {
            author_id: Set(author.id),
            name: Set("Soup".to_string()),
            image: Set("soup.png".to_string()),
            text: Set("Boil.".to_string()),
            cooking_time: Set(10),
            pub_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        (db, author.id, recipe.id)
    }

    fn favorite_row(user_id: i32, recipe_id: i32) -> favorite::ActiveModel {
        favorite::ActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            created_at: Set(Utc::now()),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_maps_to_already_exists() {
        let (db, user_id, recipe_id) = seeded_db().await;
        favorite::Entity::insert(favorite_row(user_id, recipe_id))
            .exec_without_returning(&db)
            .await
            .unwrap();

        let err = favorite::Entity::insert(favorite_row(user_id, recipe_id))
            .exec_without_returning(&db)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        match map_write_error(err, "Recipe is already in favorites.") {
            ServiceError::AlreadyExists(msg) => assert_eq!(msg, "Recipe is already in favorites."),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dangling_reference_maps_to_conflict() {
        let (db, user_id, _) = seeded_db().await;
        let err = favorite::Entity::insert(favorite_row(user_id, 9999))
            .exec_without_returning(&db)
            .await
            .unwrap_err();
        assert!(!is_unique_violation(&err));
        assert!(matches!(
            map_write_error(err, "unused"),
            ServiceError::Conflict(_)
        ));
    }
}
