//! HTTP presentation of the aggregated health report

use crate::health::{HealthService, HealthStatus};
use crate::httputil;
use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub fn health_routes(service: Arc<HealthService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(service)
}

/// Runs all checks and answers 200 on `pass`, 503 otherwise. Checks still
/// running when the client goes away are cancelled.
pub async fn health_handler(State(service): State<Arc<HealthService>>) -> Response {
    info!("GET /health - Running health checks");

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let report = service.execute(&cancel).await;

    let status_code = match report.status {
        HealthStatus::Pass => StatusCode::OK,
        status => {
            warn!("Service health is {}", status);
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    httputil::json(status_code, &report)
}
