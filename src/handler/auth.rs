use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::accounts;
use crate::auth::{issue_token, AdminUser, AuthUser};
use crate::error::AppError;
use crate::handler::AppJson;
use crate::model::{LoginRequest, RegisterRequest, Role, UserRecord};
use crate::state::AppState;

/// Profile fields plus a fresh bearer token
fn session_body(state: &AppState, user: &UserRecord) -> Result<serde_json::Value, AppError> {
    let token = issue_token(user, &state.config.jwt_secret, state.config.jwt_expiry_days)?;
    Ok(json!({
        "success": true,
        "_id": user.id,
        "name": user.name,
        "email": user.email,
        "phone": user.phone,
        "role": user.role,
        "token": token,
    }))
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = accounts::register(&state.store, payload, Role::Customer)?;
    Ok((StatusCode::CREATED, Json(session_body(&state, &user)?)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = accounts::authenticate(&state.store, &payload.email, &payload.password)?;
    Ok(Json(session_body(&state, &user)?))
}

/// `GET /api/auth/profile`
pub async fn profile(AuthUser(user): AuthUser) -> impl IntoResponse {
    let profile = user.profile();
    Json(json!({
        "success": true,
        "_id": profile.id,
        "name": profile.name,
        "email": profile.email,
        "phone": profile.phone,
        "role": profile.role,
        "createdAt": profile.created_at,
    }))
}

/// `GET /api/auth/users`
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<_> = accounts::list(&state.store)?
        .iter()
        .map(UserRecord::profile)
        .collect();

    Ok(Json(json!({ "success": true, "users": users })))
}
