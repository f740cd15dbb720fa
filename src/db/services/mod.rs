//! Data-access and domain operations. Route handlers call into these modules
//! with an already-resolved [`Actor`](crate::services::policy::Actor) and a
//! deserialized payload; status codes and response bodies are the web layer's job.

pub mod catalog;
pub mod error;
pub mod favorite_service;
pub mod follow_service;
pub mod import_service;
pub mod ingredient_service;
pub mod recipe_service;
pub mod shopping_cart_service;
pub mod tag_service;
pub mod user_service;

pub use catalog::{CatalogRepository, DbCatalog};
pub use error::{ServiceError, ValidationError};
pub use recipe_service::{RecipeAggregate, RecipeFilter, RecipeService, RecipeShort, RecipeView};
pub use shopping_cart_service::ShoppingListItem;
pub use user_service::UserProfile;
