//! Password hashing, bearer tokens and the request extractors that enforce them
//!
//! Handlers opt into authentication by taking [`AuthUser`] (any signed-in
//! user) or [`AdminUser`] (role `admin`) as an argument.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::TABLE_USERS;
use crate::error::{AppError, AppResult};
use crate::model::{Role, UserRecord};
use crate::state::AppState;

const NOT_AUTHORIZED: &str = "Not authorized, token failed";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// False for a wrong password and for an unreadable hash
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn issue_token(user: &UserRecord, secret: &str, expiry_days: i64) -> AppResult<String> {
    let now = Utc::now();
    let expires_at = Duration::try_days(expiry_days)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Internal(format!("token lifetime out of range: {} days", expiry_days)))?;
    let claims = Claims {
        sub: user.id.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token creation failed: {}", e)))
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        AppError::Unauthorized(NOT_AUTHORIZED.into())
    })
}

/// The signed-in user, loaded fresh from the store on every request so role
/// changes apply immediately
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRecord);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))?;

        let claims = decode_token(token, &state.config.jwt_secret)?;
        let user: UserRecord = state
            .store
            .fetch(TABLE_USERS, &claims.sub)?
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.into()))?;

        Ok(AuthUser(user))
    }
}

/// A signed-in user with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserRecord);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Not authorized as an admin".into()));
        }
        Ok(AdminUser(user))
    }
}
