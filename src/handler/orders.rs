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
use crate::model::CreateOrderRequest;
use crate::orders;
use crate::state::AppState;

/// `POST /api/orders`
///
/// Responds 201 with the stored order and the checkout URL the client must
/// redirect to.
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let placed = orders::create_order(
        &state.store,
        state.payments.as_ref(),
        &state.config,
        &user,
        payload,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "order": placed.order,
            "payment_url": placed.payment_url,
        })),
    ))
}

/// `GET /api/orders/{id}/verify`
pub async fn verify_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let order = orders::verify_order(&state.store, state.payments.as_ref(), &user, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Payment verified successfully",
        "order": order,
    })))
}

/// `GET /api/orders/my-orders`
pub async fn my_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = orders::list_for_user(&state.store, &user.id)?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `GET /api/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = orders::list_all(&state.store)?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `PUT /api/orders/{id}/deliver`
pub async fn mark_delivered(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let order = orders::mark_delivered(&state.store, &id)?;
    Ok(Json(json!({ "success": true, "order": order })))
}
