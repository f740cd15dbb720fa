use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::db::entities::user;
use crate::db::enums::UserRole;
use crate::db::services::user_service::{self, NewUser};
use crate::web::error::AppError;
use crate::web::models::{
    Claims, LoginRequest, RegisterRequest, SetPasswordRequest, TokenResponse, UserResponse,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;

/// Letters, digits and `.@+-_`, as accepted by most username validators.
fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_NAME_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && email.len() <= MAX_EMAIL_LENGTH
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if !is_valid_email(req.email.trim()) {
        return Err(AppError::validation("email", "Enter a valid email address."));
    }
    if !is_valid_username(req.username.trim()) {
        return Err(AppError::validation(
            "username",
            "Username may contain only letters, digits and .@+-_ characters.",
        ));
    }
    for (field, value) in [("first_name", &req.first_name), ("last_name", &req.last_name)] {
        let len = value.trim().chars().count();
        if len == 0 || len > MAX_NAME_LENGTH {
            return Err(AppError::validation(
                field,
                format!("Must be between 1 and {MAX_NAME_LENGTH} characters."),
            ));
        }
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long."),
        ));
    }
    Ok(())
}

pub async fn register_user(
    pool: &DatabaseConnection,
    req: RegisterRequest,
    bcrypt_cost: u32,
) -> Result<UserResponse, AppError> {
    validate_registration(&req)?;

    let password_hash = hash(&req.password, bcrypt_cost)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let user_model = user_service::create_user(
        pool,
        NewUser {
            email: req.email.trim().to_string(),
            username: req.username.trim().to_string(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            password_hash,
            role: UserRole::User,
        },
    )
    .await?;
    info!(user_id = user_model.id, "User registered.");

    Ok(UserResponse {
        id: user_model.id,
        email: user_model.email,
        username: user_model.username,
        first_name: user_model.first_name,
        last_name: user_model.last_name,
    })
}

pub async fn login_user(
    pool: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<TokenResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required.".to_string(),
        ));
    }

    let user = user_service::get_user_by_email(pool, req.email.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        warn!(user_id = user.id, "Rejected login with a wrong password.");
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret, ttl_hours)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<TokenResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        role: user.role,
        exp: expiration,
    };

    let auth_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(TokenResponse { auth_token })
}

/// Verifies signature and expiry.
pub fn decode_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error.");
        AppError::InvalidCredentials
    })
}

pub async fn set_password(
    pool: &DatabaseConnection,
    user_id: i32,
    req: SetPasswordRequest,
    bcrypt_cost: u32,
) -> Result<(), AppError> {
    let user = user_service::get_user_by_id(pool, user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let valid_password = verify(&req.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::validation(
            "current_password",
            "Current password is incorrect.",
        ));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            "new_password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long."),
        ));
    }

    let password_hash = hash(&req.new_password, bcrypt_cost)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;
    user_service::update_password_hash(pool, user, password_hash).await?;
    info!(user_id, "Password changed.");
    Ok(())
}
