//! Building blocks for backend services: health-check aggregation, clock
//! abstraction, HTTP response helpers, network waiters and logging bootstrap.

pub mod config;
pub mod error;
pub mod health;
pub mod httputil;
pub mod logging;
pub mod netutil;
pub mod timeutil;

pub use crate::config::AppConfig;
pub use error::{KitError, Result};
pub use health::{
    health_routes, CheckResult, Checker, DbCheck, FnCheck, HealthReport, HealthService,
    HealthServiceConfig, HealthStatus, StubCheck, TimeoutCheck, UrlCheck,
};
pub use logging::{LogConfig, LogFormat, LogLevel, LogProfile};
pub use timeutil::{Clock, MockClock, SystemClock};

use axum::Router;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
