//! Concurrent execution and aggregation of registered health checks

use crate::error::{KitError, Result};
use crate::health::checks::{CheckResult, Checker, HealthReport, HealthStatus, TimeoutCheck};
use crate::timeutil::{Clock, SystemClock};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Construction parameters for [`HealthService`].
#[derive(Default)]
pub struct HealthServiceConfig {
    pub name: String,
    pub description: String,
    pub version: String,
    pub commit: String,
    pub checks: Vec<Arc<dyn Checker>>,
    /// Falls back to [`SystemClock`] when unset.
    pub clock: Option<Arc<dyn Clock>>,
    /// Upper bound applied to every check on top of its own timeout.
    pub check_timeout: Option<Duration>,
}

impl HealthServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KitError::Config("service name is required".to_string()));
        }

        if self.check_timeout == Some(Duration::ZERO) {
            return Err(KitError::Config(
                "check timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

pub struct HealthService {
    name: String,
    description: String,
    version: String,
    commit: String,
    checks: Vec<Arc<dyn Checker>>,
    clock: Arc<dyn Clock>,
    check_timeout: Option<Duration>,
}

impl HealthService {
    pub fn new(config: HealthServiceConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            name: config.name,
            description: config.description,
            version: config.version,
            commit: config.commit,
            checks: config.checks,
            clock: config.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            check_timeout: config.check_timeout,
        })
    }

    pub fn add_check<C: Checker + 'static>(&mut self, check: C) {
        self.checks.push(Arc::new(check));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn checks(&self) -> &[Arc<dyn Checker>] {
        &self.checks
    }

    /// Runs every registered check concurrently and waits for all of them.
    ///
    /// `cancel` is handed to each check unchanged. A check that panics is
    /// reported as failed; it never aborts the run. If this future is dropped
    /// the checks still in flight are cancelled.
    pub async fn execute(&self, cancel: &CancellationToken) -> HealthReport {
        let mut report = HealthReport::new(
            self.name.clone(),
            self.description.clone(),
            self.version.clone(),
            self.commit.clone(),
            self.clock.now().timestamp(),
        );

        let run_cancel = cancel.child_token();
        let _run_guard = run_cancel.clone().drop_guard();
        let started = Instant::now();

        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let name = check.name().to_string();
                let check = self.bounded(check);
                let cancel = run_cancel.clone();
                let handle = tokio::spawn(async move {
                    let start = Instant::now();
                    let result = check.check(&cancel).await;
                    (result, start.elapsed())
                });
                (name, handle)
            })
            .collect();

        let runs = handles.into_iter().map(|(name, handle)| async move {
            let result = match handle.await {
                Ok((result, elapsed)) => {
                    debug!(
                        check = %name,
                        status = %result.status,
                        error = result.error.as_ref().map(tracing::field::display),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Health check completed"
                    );
                    result
                }
                Err(e) if e.is_panic() => {
                    error!(check = %name, "Health check panicked");
                    CheckResult::fail("check panicked")
                }
                Err(e) => {
                    error!(check = %name, error = %e, "Health check task aborted");
                    CheckResult::fail(format!("check task aborted: {}", e))
                }
            };
            (name, result)
        });

        for (name, result) in join_all(runs).await {
            if report.record(name.clone(), result).is_some() {
                warn!(check = %name, "Duplicate health check name, earlier result overwritten");
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match report.status {
            HealthStatus::Fail => warn!(
                service = %self.name,
                checks = report.checks.len(),
                elapsed_ms,
                "Health checks completed - Overall status: {}",
                report.status
            ),
            _ => info!(
                service = %self.name,
                checks = report.checks.len(),
                elapsed_ms,
                "Health checks completed - Overall status: {}",
                report.status
            ),
        }

        report
    }

    fn bounded(&self, check: &Arc<dyn Checker>) -> Arc<dyn Checker> {
        match self.check_timeout {
            Some(timeout) => Arc::new(TimeoutCheck::new(check.clone(), timeout)),
            None => check.clone(),
        }
    }
}
