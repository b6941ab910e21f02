use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cv_builder::config::{Config, ProfileBackend};
use cv_builder::profile::identity::IdentityClient;
use cv_builder::profile::{MemoryProfileStore, ProfileRecords};
use cv_builder::routes::build_router;
use cv_builder::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "cv_builder={},tower_http={}",
                &config.rust_log, &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV builder API v{}", env!("CARGO_PKG_VERSION"));

    // Sessions are always verified against the identity provider
    let identity = Arc::new(IdentityClient::new(
        &config.identity_api_url,
        &config.identity_secret_key,
    )?);
    info!("Identity client initialized ({})", config.identity_api_url);

    let profiles: Arc<dyn ProfileRecords> = match config.profile_backend {
        ProfileBackend::Identity => identity.clone(),
        ProfileBackend::Memory => {
            warn!("PROFILE_BACKEND=memory: saved CVs are lost on restart");
            Arc::new(MemoryProfileStore::default())
        }
    };

    let state = AppState {
        profiles,
        sessions: identity,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
