// src/main.rs
use std::{net::SocketAddr, sync::Arc};

use punch_relay::{api, FormReplayClient, PortalConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PortalConfig::from_env()?;
    info!(
        base = %config.base_url,
        login = %config.login_path,
        punch = %config.punch_path,
        timeout_ms = config.timeout_ms,
        "portal configured"
    );
    let client = FormReplayClient::new(Arc::new(config))?;

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;
    info!("punch relay listening on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, api::router(client)).await?;
    Ok(())
}
