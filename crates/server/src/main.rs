mod dev;
mod error;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clubhouse_backend::{MemoryBackend, RestBackend};
use clubhouse_runtime_config::ClubConfig;

use state::{AppConfig, AppState, SharedBackend};

/// Pick the backend: the in-memory fake for local development, else the hosted service.
fn load_backend(config: &ClubConfig) -> anyhow::Result<SharedBackend> {
    if std::env::var("CLUBHOUSE_BACKEND").is_ok_and(|v| v == "memory") {
        tracing::warn!("CLUBHOUSE_BACKEND=memory: data lives in this process only");
        let backend = MemoryBackend::new();
        dev::seed(
            &backend,
            std::env::var(dev::DEV_INVITES_ENV).ok().as_deref(),
            std::env::var(dev::DEV_ADMIN_ENV).ok().as_deref(),
        )?;
        return Ok(Arc::new(backend));
    }
    if !config.backend.is_configured() {
        anyhow::bail!(
            "backend not configured: set CLUBHOUSE_BACKEND_URL and CLUBHOUSE_ANON_KEY \
             (or CLUBHOUSE_BACKEND=memory)"
        );
    }
    let backend = RestBackend::new(
        &config.backend.url,
        &config.backend.anon_key,
        config.backend.timeout(),
    )
    .context("build backend client")?;
    tracing::info!("backend: {}", backend.base_url());
    Ok(Arc::new(backend))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubhouse_server=info,tower_http=info".into()),
        )
        .init();

    let mut club = match std::env::var("CLUBHOUSE_CONFIG") {
        Ok(path) => ClubConfig::load(&PathBuf::from(&path))
            .with_context(|| format!("read config {path}"))?,
        Err(_) => ClubConfig::default(),
    };
    club.apply_env();

    let backend = load_backend(&club)?;
    let config = AppConfig {
        base_url: club.site.base_url.clone(),
    };
    let state = AppState::new(backend, config);

    let web_dir = std::env::var("CLUBHOUSE_WEB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("web/build"));
    let app = routes::app(state, Some(web_dir.as_path()));

    tracing::info!("starting server at {}", club.site.base_url);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
