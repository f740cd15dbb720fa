//! SeaORM entities, one module per table.

pub mod favorite;
pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod shopping_cart;
pub mod tag;
pub mod user;

pub mod prelude {
    pub use super::favorite::Entity as Favorite;
    pub use super::follow::Entity as Follow;
    pub use super::ingredient::Entity as Ingredient;
    pub use super::recipe::Entity as Recipe;
    pub use super::recipe_ingredient::Entity as RecipeIngredient;
    pub use super::recipe_tag::Entity as RecipeTag;
    pub use super::shopping_cart::Entity as ShoppingCart;
    pub use super::tag::Entity as Tag;
    pub use super::user::Entity as User;
}
