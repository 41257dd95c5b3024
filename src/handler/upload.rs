use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::state::AppState;

/// Multipart field holding the file
const IMAGE_FIELD: &str = "image";

/// `POST /api/upload`
///
/// Accepts a single `image/*` file in the `image` field and returns its URL
/// and the id to reference it by in a product's `images`.
pub async fn upload_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(AppError::Validation("Only image files are allowed".into()));
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("No file uploaded".into()));
        }

        let image = state
            .images
            .store(&file_name, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("image upload failed: {}", e)))?;
        info!(public_id = %image.public_id, "image uploaded");

        return Ok(Json(json!({
            "success": true,
            "url": image.url,
            "public_id": image.public_id,
        })));
    }

    Err(AppError::Validation("No file uploaded".into()))
}
