//! # API crate: domain operations of the blog
//!
//! Everything the HTTP layer calls lives here as plain async functions over a
//! [`store::DocumentStore`] and an [`assets::AssetStore`]. Nothing in this
//! crate knows about requests, cookies or status codes; failures are
//! [`ApiError`]s whose [`ErrorKind`] the server maps to a status.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | | Session token codec (JWT), authorization gate, password hashing |
//! | [`feed`] | | Global, own, category, author, search and following feeds |
//! | [`engagement`] | | Like / unlike, comment, delete comment, list comments |
//! | [`accounts`] | | Sign up / in, profiles, follow graph, profile edit, account deletion |
//! | [`articles`] | | Create, edit, delete and view articles |
//! | [`assets`] | | Avatar and image blobs on disk or in memory |
//! | [`reading_time`] | | `"{n} min read"` from rich-text content |
//! | [`error`] | | [`ApiError`] and its kinds |
//! | [`db`] | `postgres` | sqlx pool, migrations and the Postgres [`store::DocumentStore`] |

use std::sync::Arc;

use store::DocumentStore;

pub mod accounts;
pub mod articles;
pub mod assets;
pub mod auth;
#[cfg(feature = "postgres")]
pub mod db;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod reading_time;

#[cfg(test)]
mod testing;

pub use error::{ApiError, ApiResult, ErrorKind};

use assets::AssetStore;

/// The backends an operation may touch.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub assets: Arc<dyn AssetStore>,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>, assets: Arc<dyn AssetStore>) -> Self {
        Self { store, assets }
    }
}

/// Reject the submission unless every value has non-whitespace content.
pub(crate) fn require_filled<S: AsRef<str>>(values: &[S]) -> ApiResult<()> {
    if values.iter().any(|v| v.as_ref().trim().is_empty()) {
        return Err(ApiError::incomplete());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_filled() {
        assert!(require_filled(&["a", "b"]).is_ok());
        assert_eq!(require_filled(&["a", " "]), Err(ApiError::incomplete()));
        assert_eq!(require_filled::<&str>(&[]), Ok(()));
    }
}
