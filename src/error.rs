//! Application error type and its JSON envelope
//!
//! Every handler returns `Result<_, AppError>`. The error is rendered as
//! `{"success": false, "message": "..."}` with a status code matching the
//! failure class.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::payment::PaymentError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid token or bad credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// The payment provider failed or rejected the call (502)
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Internal failures are logged and replaced
    /// by a generic message.
    pub fn response_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Serialization(_) | Self::Internal(_) => {
                "Internal Server Error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (
            status,
            Json(json!({
                "success": false,
                "message": self.response_message(),
            })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

// redb reports each transaction stage with its own error type; all of them
// fold into `redb::Error`.
macro_rules! storage_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AppError {
                fn from(err: $ty) -> Self {
                    AppError::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type AppResult<T> = Result<T, AppError>;
