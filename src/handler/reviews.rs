use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::handler::AppJson;
use crate::model::CreateReviewRequest;
use crate::reviews;
use crate::state::AppState;

/// `POST /api/reviews`
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let review = reviews::create(&state.store, &user, payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Review added", "review": review })),
    ))
}

/// `GET /api/reviews/{product_id}`
pub async fn product_reviews(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if product_id.trim().is_empty() || product_id == "undefined" {
        return Err(AppError::Validation("Invalid product ID".into()));
    }
    let reviews = reviews::list_for_product(&state.store, &product_id)?;
    Ok(Json(json!({ "success": true, "reviews": reviews })))
}

/// `GET /api/reviews/all`
pub async fn all_reviews(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let reviews = reviews::list_all(&state.store)?;
    Ok(Json(json!({ "success": true, "reviews": reviews })))
}

/// `DELETE /api/reviews/{id}`
pub async fn delete_review(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    reviews::delete(&state.store, &id)?;
    Ok(Json(json!({ "success": true, "message": "Review removed" })))
}
