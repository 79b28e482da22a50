use api::{ApiError, ErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// A domain failure on its way out as `{"error": "..."}`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct AppError(#[from] pub ApiError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::incomplete(), StatusCode::BAD_REQUEST),
            (ApiError::EmptyText, StatusCode::BAD_REQUEST),
            (ApiError::article_not_found(), StatusCode::NOT_FOUND),
            (ApiError::AlreadyLiked, StatusCode::CONFLICT),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Unauthorized, StatusCode::FORBIDDEN),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        ];
        for (error, status) in cases {
            assert_eq!(AppError(error).status(), status);
        }
    }
}
