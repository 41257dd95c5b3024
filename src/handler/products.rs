use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::auth::AdminUser;
use crate::catalog;
use crate::error::AppError;
use crate::handler::AppJson;
use crate::model::{CreateProductRequest, UpdateProductRequest};
use crate::state::AppState;

/// `GET /api/products`
pub async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = catalog::list(&state.store)?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// `GET /api/products/{id}`
pub async fn get_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::get(&state.store, &id)?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// `POST /api/products`
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::create(&state.store, payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product": product })),
    ))
}

/// `PUT /api/products/{id}`
pub async fn update_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::update(&state.store, &id, payload)?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// `DELETE /api/products/{id}`
pub async fn delete_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete(&state.store, state.images.as_ref(), &id).await?;
    Ok(Json(json!({ "success": true, "message": "Product removed" })))
}
