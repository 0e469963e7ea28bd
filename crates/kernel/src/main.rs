//! Folio site server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use folio_kernel::secrets::EnvSecrets;
use folio_kernel::{AppState, Config, Services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Folio");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        port = config.port,
        site_url = %config.site_url,
        transport = ?config.email_transport,
        "Configuration loaded"
    );

    let services = Services::from_config(&config, Arc::new(EnvSecrets))
        .context("failed to initialize upstream clients")?;
    let state = AppState::new(&config, services);

    let app = folio_kernel::app(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
