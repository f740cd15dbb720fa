//! Recipe-sharing backend: recipes with ingredient amounts and tags, favorites,
//! a shopping cart that aggregates into a downloadable shopping list, and
//! author subscriptions.

pub mod db;
pub mod server;
pub mod services;
pub mod web;
