//! # Blog HTTP server
//!
//! [`router`] mounts every endpoint on an [`AppState`]; `main.rs` adds CORS,
//! static assets and the listener. Handlers are thin: they pull the session,
//! page and form out of the request, call one operation from the `api` crate
//! and shape the JSON reply.
//!
//! | Method | Path | Session |
//! |--------|------|---------|
//! | POST | `/user/signup`, `/user/signin` | sets |
//! | GET | `/user/signout` | required, clears |
//! | GET | `/user/me` | required, refreshed |
//! | GET | `/user/{username}` | optional |
//! | POST | `/user/follow/{username}`, `/user/unfollow/{username}` | required |
//! | PATCH, DELETE | `/user` | required |
//! | POST | `/article` | required |
//! | GET | `/article/{id}` | optional |
//! | PATCH, DELETE | `/article/{id}` | required |
//! | GET | `/articles`, `/articles/search`, `/articles/{username}`, `/articles/category/{category}` | none |
//! | GET | `/articles/following`, `/articles/my` | required |
//! | POST | `/article/like/{id}`, `/article/unlike/{id}`, `/article/comment/{id}` | required |
//! | GET | `/article/{id}/comments` | none |
//! | DELETE | `/article/{id}/comments/delete/{comment_id}` | required |
//! | GET | `/message` | none |

use std::sync::Arc;

use api::auth::SessionCodec;
use api::Services;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use store::DocumentStore;
use tokio::signal::{self, ctrl_c};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod extract;
pub mod routes;
pub mod settings;

use routes::{article, user};

/// Uploads larger than this are rejected before reaching a handler.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub codec: Arc<SessionCodec>,
    /// Marks the session cookie `Secure` and `SameSite=None`.
    pub secure_cookie: bool,
}

impl AppState {
    pub fn new(services: Services, codec: SessionCodec, secure_cookie: bool) -> Self {
        Self {
            services,
            codec: Arc::new(codec),
            secure_cookie,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.services.store.as_ref()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/message", get(routes::health))
        .route("/user/signup", post(user::sign_up))
        .route("/user/signin", post(user::sign_in))
        .route("/user/signout", get(user::sign_out))
        .route("/user/me", get(user::me))
        .route("/user/follow/{username}", post(user::follow))
        .route("/user/unfollow/{username}", post(user::unfollow))
        .route("/user/{username}", get(user::profile))
        .route(
            "/user",
            patch(user::edit_profile).delete(user::delete_account),
        )
        .route("/article", post(article::create))
        .route(
            "/article/{id}",
            get(article::get).patch(article::edit).delete(article::delete),
        )
        .route("/article/like/{id}", post(article::like))
        .route("/article/unlike/{id}", post(article::unlike))
        .route("/article/comment/{id}", post(article::comment))
        .route("/article/{id}/comments", get(article::comments))
        .route(
            "/article/{id}/comments/delete/{comment_id}",
            delete(article::delete_comment),
        )
        .route("/articles", get(article::global_feed))
        .route("/articles/search", get(article::search))
        .route("/articles/following", get(article::following_feed))
        .route("/articles/my", get(article::my_feed))
        .route("/articles/category/{category}", get(article::category_feed))
        .route("/articles/{username}", get(article::author_feed))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
