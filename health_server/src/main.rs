//! Main entry point for the health server binary

use anyhow::Result;
use service_kit::{health_routes, logging, run_server, AppConfig, HealthService};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    logging::init(&config.log)?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let service = HealthService::new(config.health_service_config()?)?;

    info!(
        "Service: {} v{} ({}) with {} health checks",
        service.name(),
        service.version(),
        service.commit(),
        service.checks().len()
    );

    let app = logging::trace_http(health_routes(Arc::new(service)));

    run_server(app, addr).await?;

    info!("Server shutdown complete");
    Ok(())
}
