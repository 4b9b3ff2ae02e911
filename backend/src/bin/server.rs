//! Land-cover dashboard HTTP server binary.
//!
//! Loads the configuration, the classification asset, the municipality
//! boundaries and the insurance export, then serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin lulc-server
//! LULC_CONFIG=/etc/lulc.toml cargo run --bin lulc-server
//! ```
//!
//! # Environment Variables
//!
//! - `LULC_CONFIG`: Path of the TOML configuration file
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use lulc_dash::config::AppConfig;
use lulc_dash::http::{create_router_with_limit, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting land-cover dashboard server");

    let config = AppConfig::from_default_location()?.with_env_overrides();
    info!(
        asset = %config.dataset.asset_id,
        first_year = config.dataset.first_year,
        last_year = config.dataset.last_year,
        "configuration loaded"
    );

    let state = AppState::from_config(&config)?;
    if state.engine.grid().is_none() {
        warn!("no classification asset loaded; land-cover statistics will fail");
    }
    if state.resolver.regions().is_empty() {
        warn!("no named regions available; only uploads and GeoJSON can define a study area");
    }

    let app = create_router_with_limit(state, config.server.body_limit_mb * 1024 * 1024);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
