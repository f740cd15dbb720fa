#![allow(dead_code)]

use std::sync::Arc;

use foodgram::db::entities::{ingredient, tag, user};
use foodgram::db::enums::UserRole;
use foodgram::db::schema;
use foodgram::db::services::user_service::{self, NewUser};
use foodgram::db::services::{ingredient_service, tag_service, RecipeService};
use foodgram::server::config::ServerConfig;
use foodgram::services::policy::{Actor, AuthenticatedUser};
use foodgram::web::models::catalog_models::TagPayload;
use foodgram::web::models::recipe_models::{IngredientLine, RecipePayload};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub const MAX_COOKING_TIME: i32 = 1441;
pub const JWT_SECRET: &str = "test-secret";

/// Fresh in-memory SQLite database with the schema applied. A single pooled
/// connection keeps every query on the same in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    schema::create_schema(&db).await.unwrap();
    db
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::for_database("sqlite::memory:", JWT_SECRET);
    config.bcrypt_cost = 4;
    config
}

pub async fn create_user(db: &DatabaseConnection, username: &str, role: UserRole) -> user::Model {
    let password_hash = bcrypt::hash("password123", 4).unwrap();
    user_service::create_user(
        db,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
            password_hash,
            role,
        },
    )
    .await
    .unwrap()
}

pub fn actor(user: &user::Model) -> Actor {
    Actor::User(AuthenticatedUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    })
}

pub async fn create_ingredient(db: &DatabaseConnection, name: &str, unit: &str) -> ingredient::Model {
    ingredient_service::get_or_create_ingredient(db, name, unit)
        .await
        .unwrap()
        .0
}

pub async fn create_tag(db: &DatabaseConnection, name: &str, color: &str, slug: &str) -> tag::Model {
    let payload = TagPayload {
        name: name.to_string(),
        color: color.to_string(),
        slug: slug.to_string(),
    };
    tag_service::get_or_create_tag(db, &payload).await.unwrap().0
}

pub fn recipe_payload(name: &str, ingredients: &[(i32, i32)], tags: &[i32]) -> RecipePayload {
    RecipePayload {
        name: name.to_string(),
        image: format!("recipes/images/{}.png", name.to_lowercase().replace(' ', "_")),
        text: format!("How to cook {name}."),
        cooking_time: 30,
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientLine { id, amount })
            .collect(),
        tags: tags.to_vec(),
    }
}

/// Two ordinary users, an admin, four catalog ingredients and two tags.
pub struct Fixture {
    pub db: DatabaseConnection,
    pub service: Arc<RecipeService>,
    pub author: user::Model,
    pub other: user::Model,
    pub admin: user::Model,
    pub flour: ingredient::Model,
    pub sugar: ingredient::Model,
    pub eggs: ingredient::Model,
    pub sugar_tbsp: ingredient::Model,
    pub breakfast: tag::Model,
    pub dinner: tag::Model,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let author = create_user(&db, "author", UserRole::User).await;
        let other = create_user(&db, "other", UserRole::User).await;
        let admin = create_user(&db, "admin", UserRole::Admin).await;
        let flour = create_ingredient(&db, "Flour", "g").await;
        let sugar = create_ingredient(&db, "Sugar", "g").await;
        let eggs = create_ingredient(&db, "Eggs", "pcs").await;
        let sugar_tbsp = create_ingredient(&db, "Sugar", "tbsp").await;
        let breakfast = create_tag(&db, "Breakfast", "#E26C2D", "breakfast").await;
        let dinner = create_tag(&db, "Dinner", "#8775D2", "dinner").await;
        let service = Arc::new(RecipeService::with_database_catalog(
            db.clone(),
            MAX_COOKING_TIME,
        ));
        Self {
            db,
            service,
            author,
            other,
            admin,
            flour,
            sugar,
            eggs,
            sugar_tbsp,
            breakfast,
            dinner,
        }
    }

    pub fn author_actor(&self) -> Actor {
        actor(&self.author)
    }

    pub fn other_actor(&self) -> Actor {
        actor(&self.other)
    }

    pub fn admin_actor(&self) -> Actor {
        actor(&self.admin)
    }

    /// Pancakes: flour 200 g, sugar 50 g, eggs 2; tagged breakfast.
    pub fn pancakes(&self) -> RecipePayload {
        recipe_payload(
            "Pancakes",
            &[(self.flour.id, 200), (self.sugar.id, 50), (self.eggs.id, 2)],
            &[self.breakfast.id],
        )
    }
}
