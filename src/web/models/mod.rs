use serde::{Deserialize, Deserializer, Serialize};

use crate::db::enums::UserRole;
use crate::db::services::follow_service::Followee;
use crate::db::services::{RecipeShort, UserProfile};

pub mod catalog_models;
pub mod recipe_models;

pub use crate::services::policy::{Actor, AuthenticatedUser};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Returned by registration; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// An author in the caller's subscriptions, with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: u64,
}

impl From<Followee> for SubscriptionResponse {
    fn from(followee: Followee) -> Self {
        Self {
            profile: UserProfile::new(&followee.author, true),
            recipes: followee.recipes.iter().map(RecipeShort::from).collect(),
            recipes_count: followee.recipes_count,
        }
    }
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // email
    pub user_id: i32,
    pub role: UserRole,
    pub exp: usize,
}

/// Accepts `1`/`0`, `true`/`false` and their string forms for query flags.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Flag::Bool(b)) => Ok(b),
        Some(Flag::Int(i)) => Ok(i != 0),
        Some(Flag::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "" | "0" | "false" | "no" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean flag, got '{other}'"
            ))),
        },
    }
}
