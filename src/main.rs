use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reacho::config::ServerConfig;
use reacho::routes;
use reacho::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let config = ServerConfig::from_env().map_err(|e| anyhow::anyhow!("configuration: {e}"))?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState::new(config);
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "reacho server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
