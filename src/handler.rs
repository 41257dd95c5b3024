//! HTTP request handlers
//!
//! Handlers are thin: they extract and authorize the request, call into the
//! service modules and wrap the result in the `{"success": true, ...}`
//! envelope. Failures are rendered by [`AppError`](crate::error::AppError).

use axum::{
    extract::FromRequest,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::error::AppError;

pub mod auth;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod upload;

/// JSON body extractor whose rejection is an [`AppError`], so malformed bodies
/// get the same envelope as every other failure
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Storefront API is running..." }))
}

/// `GET /api/health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "System is healthy",
        "timestamp": Utc::now(),
    }))
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found: {}", uri.path()),
        })),
    )
}
