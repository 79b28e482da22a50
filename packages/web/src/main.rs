use std::sync::Arc;

use anyhow::Context;
use api::assets::DiskAssets;
use api::auth::SessionCodec;
use api::Services;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use store::{DocumentStore, MemoryStore};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use web::settings::{Backend, Settings};
use web::{router, shutdown_signal, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let settings = Settings::new().context("Failed to load settings")?;
    if settings.auth.jwt_secret == "change-me" {
        warn!("Using the default JWT secret; set APP_AUTH__JWT_SECRET");
    }

    let store = open_store(&settings).await?;
    let services = Services::new(store, Arc::new(DiskAssets::new(&settings.assets.dir)));
    let codec = SessionCodec::new(settings.auth.jwt_secret.as_bytes())
        .with_ttl(chrono::Duration::days(settings.auth.token_ttl_days));
    let state = AppState::new(services, codec, settings.auth.secure_cookie);

    let origin: HeaderValue = settings
        .cors
        .client_origin
        .parse()
        .context("Invalid CORS client origin")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let app = router(state)
        .nest_service("/assets", ServeDir::new(&settings.assets.dir))
        .layer(cors);

    let address = settings.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match settings.database.backend {
        Backend::Memory => {
            info!("Using the in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "postgres")]
        Backend::Postgres => {
            let pool = api::db::connect(&settings.database.url, settings.database.max_connections)
                .await
                .context("Failed to connect to database")?;
            api::db::migrate(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Connected to Postgres");
            Ok(Arc::new(api::db::PgStore::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        Backend::Postgres => anyhow::bail!("Built without the `postgres` feature"),
    }
}
