use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use census_common::results::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("incorrect access control password")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(_) => ApiError::NotFound("result"),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),

            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            ApiError::Database(_) | ApiError::Store(_) => {
                tracing::error!("request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
        .into_response()
    }
}
