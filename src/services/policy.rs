//! Who may do what. Every check here is a pure function of the acting user and
//! the target; nothing is cached between requests.

use crate::db::entities::recipe;
use crate::db::enums::UserRole;
use crate::db::services::error::ServiceError;

/// Identity resolved from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
}

/// The caller of an operation. Read endpoints accept anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(AuthenticatedUser),
}

impl Actor {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Actor::Anonymous => None,
            Actor::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<i32> {
        self.user().map(|u| u.id)
    }

    pub fn require_user(&self) -> Result<&AuthenticatedUser, ServiceError> {
        self.user().ok_or(ServiceError::Unauthenticated)
    }
}

pub fn can_mutate_recipe(actor: &Actor, recipe: &recipe::Model) -> bool {
    match actor {
        Actor::Anonymous => false,
        Actor::User(user) => user.id == recipe.author_id || user.role.is_elevated(),
    }
}

pub fn can_manage_catalog(actor: &Actor) -> bool {
    actor.user().is_some_and(|u| u.role.is_elevated())
}

pub fn ensure_can_mutate_recipe(actor: &Actor, recipe: &recipe::Model) -> Result<(), ServiceError> {
    actor.require_user()?;
    if can_mutate_recipe(actor, recipe) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

pub fn ensure_can_manage_catalog(actor: &Actor) -> Result<(), ServiceError> {
    actor.require_user()?;
    if can_manage_catalog(actor) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}
