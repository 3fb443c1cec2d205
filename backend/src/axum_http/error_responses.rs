use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{
    axum_http::views::error_page::render_error_page, usecases::subscriptions::SubscriptionError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", msg),
            AppError::Internal(err) => {
                error!(error = %err, "admin_pages: internal error rendering page");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Html(render_error_page(title, &message))).into_response()
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::Internal(inner) => AppError::Internal(inner),
            other if other.status_code() == StatusCode::NOT_FOUND => {
                AppError::NotFound(other.user_message())
            }
            other => AppError::BadRequest(other.user_message()),
        }
    }
}
