//! Error taxonomy shared by every domain operation.
//!
//! Each [`ApiError`] belongs to one [`ErrorKind`]; the HTTP layer maps kinds to
//! status codes and renders the `Display` text as the user-visible message.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Authorization,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Comment text cannot be empty")]
    EmptyText,

    #[error("{0}")]
    NotFound(String),

    #[error("You cannot like article twice")]
    AlreadyLiked,

    #[error("You cannot unlike article twice")]
    NotLiked,

    #[error("{0}")]
    Conflict(String),

    #[error("No access")]
    Unauthorized,

    #[error("Session token is invalid or expired")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) | ApiError::EmptyText => ErrorKind::Validation,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::AlreadyLiked | ApiError::NotLiked | ApiError::Conflict(_) => {
                ErrorKind::Conflict
            }
            ApiError::Unauthorized | ApiError::InvalidToken | ApiError::Forbidden(_) => {
                ErrorKind::Authorization
            }
        }
    }

    pub fn incomplete() -> Self {
        ApiError::Validation("Data is incomplete".into())
    }

    pub fn user_not_found() -> Self {
        ApiError::NotFound("User was not found".into())
    }

    pub fn article_not_found() -> Self {
        ApiError::NotFound("Article was not found".into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Log `error` and return the generic failure message for `action`.
pub(crate) fn conflict(action: &str, error: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %error, "Failed to {action}");
    ApiError::Conflict(format!("Failed to {action}. Try again"))
}

/// Flatten store and asset failures into the generic conflict message of an
/// operation.
///
/// The underlying error is logged, never shown to the caller.
pub(crate) trait OrConflict<T> {
    fn or_conflict(self, action: &str) -> ApiResult<T>;
}

impl<T, E: std::fmt::Display> OrConflict<T> for Result<T, E> {
    fn or_conflict(self, action: &str) -> ApiResult<T> {
        self.map_err(|e| conflict(action, e))
    }
}

#[cfg(test)]
mod tests {
    use store::StoreError;

    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ApiError::EmptyText.kind(), ErrorKind::Validation);
        assert_eq!(ApiError::AlreadyLiked.kind(), ErrorKind::Conflict);
        assert_eq!(ApiError::InvalidToken.kind(), ErrorKind::Authorization);
        assert_eq!(ApiError::user_not_found().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_store_errors_become_generic_conflicts() {
        let failed: Result<(), StoreError> = Err(StoreError::Backend("socket closed".into()));
        let err = failed.or_conflict("like an article").unwrap_err();
        assert_eq!(err, ApiError::Conflict("Failed to like an article. Try again".into()));
        assert!(!err.to_string().contains("socket"));
    }
}
