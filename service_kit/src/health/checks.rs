//! Health check result model, the `Checker` capability and the built-in checks

use crate::error::{KitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Pass => write!(f, "pass"),
            HealthStatus::Warn => write!(f, "warn"),
            HealthStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Outcome of a single check. `error` stays in-process and is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    pub error: Option<Arc<anyhow::Error>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self {
            status: HealthStatus::Pass,
            message: None,
            error: None,
            details: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Warn,
            message: Some(message.into()),
            error: None,
            details: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Fail,
            message: Some(message.into()),
            error: None,
            details: None,
        }
    }

    /// Failing result whose message is the error's display text.
    pub fn from_error<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let err = err.into();
        Self::fail(err.to_string()).with_error(err)
    }

    pub fn with_error<E>(mut self, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        self.error = Some(Arc::new(err.into()));
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_fail(&self) -> bool {
        self.status == HealthStatus::Fail
    }
}

/// Aggregated outcome of one run over every registered check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub service: String,
    pub description: String,
    pub version: String,
    pub commit: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub checks: HashMap<String, CheckResult>,
    pub timestamp: i64,
}

impl HealthReport {
    pub fn new(
        service: String,
        description: String,
        version: String,
        commit: String,
        timestamp: i64,
    ) -> Self {
        Self {
            service,
            description,
            version,
            commit,
            status: HealthStatus::Pass,
            message: None,
            checks: HashMap::new(),
            timestamp,
        }
    }

    /// Stores a check outcome. Once a failure is recorded the report stays failed.
    /// Returns the outcome previously stored under the same name, if any.
    pub fn record(&mut self, name: String, result: CheckResult) -> Option<CheckResult> {
        if result.is_fail() {
            self.status = HealthStatus::Fail;
        }
        self.checks.insert(name, result)
    }

    pub fn is_pass(&self) -> bool {
        self.status == HealthStatus::Pass
    }
}

/// A named probe. Implementations must honor `cancel` and report failures
/// through the returned `CheckResult` instead of panicking.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self, cancel: &CancellationToken) -> CheckResult;
}

#[async_trait::async_trait]
impl<T: Checker + ?Sized> Checker for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn check(&self, cancel: &CancellationToken) -> CheckResult {
        (**self).check(cancel).await
    }
}

/// Returns a fixed outcome.
pub struct StubCheck {
    name: String,
    passes: bool,
}

impl StubCheck {
    pub fn new(name: impl Into<String>, passes: bool) -> Self {
        Self {
            name: name.into(),
            passes,
        }
    }
}

#[async_trait::async_trait]
impl Checker for StubCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _cancel: &CancellationToken) -> CheckResult {
        if self.passes {
            CheckResult::pass()
        } else {
            CheckResult::fail("Stub check failed").with_error(anyhow::anyhow!("stub check failed"))
        }
    }
}

/// Probes an HTTP endpoint with a GET request.
pub struct UrlCheck {
    name: String,
    target_url: reqwest::Url,
    timeout: Duration,
    client: reqwest::Client,
    valid_status_codes: Vec<u16>,
}

impl UrlCheck {
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(KitError::Config("target URL is required".to_string()));
        }

        let target_url = reqwest::Url::parse(url)
            .map_err(|e| KitError::InvalidUrl(format!("{}: {}", url, e)))?;

        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            name: name.into(),
            target_url,
            timeout: DEFAULT_CHECK_TIMEOUT,
            client,
            valid_status_codes: vec![200, 201, 202, 204],
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_valid_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.valid_status_codes = codes;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn target_url(&self) -> &str {
        self.target_url.as_str()
    }

    fn is_valid_status_code(&self, code: u16) -> bool {
        self.valid_status_codes.contains(&code)
    }
}

#[async_trait::async_trait]
impl Checker for UrlCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, cancel: &CancellationToken) -> CheckResult {
        let start = Instant::now();
        let request = self
            .client
            .get(self.target_url.clone())
            .timeout(self.timeout)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return CheckResult::fail("check cancelled"),
            response = request => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                return CheckResult::fail(format!("Failed to create request: {}", e)).with_error(e);
            }
        };

        let duration = start.elapsed();
        let status_code = response.status().as_u16();

        if !self.is_valid_status_code(status_code) {
            let body = response.text().await.unwrap_or_default();
            let message = format!("unexpected response. status: {} body: {}", status_code, body);
            return CheckResult::fail(message.clone()).with_error(anyhow::anyhow!(message));
        }

        CheckResult::pass().with_details(serde_json::json!({
            "url": self.target_url.as_str(),
            "statusCode": status_code,
            "duration": format!("{:?}", duration),
        }))
    }
}

/// Verifies a database connection with `SELECT 1`.
pub struct DbCheck {
    name: String,
    pool: sqlx::SqlitePool,
    timeout: Duration,
}

impl DbCheck {
    pub fn new(name: impl Into<String>, pool: sqlx::SqlitePool) -> Self {
        Self {
            name: name.into(),
            pool,
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl Checker for DbCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, cancel: &CancellationToken) -> CheckResult {
        let start = Instant::now();
        let query = sqlx::query("SELECT 1").execute(&self.pool);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return CheckResult::fail("check cancelled"),
            outcome = tokio::time::timeout(self.timeout, query) => outcome,
        };

        match outcome {
            Ok(Ok(_)) => CheckResult::pass().with_details(serde_json::json!({
                "query_time_ms": start.elapsed().as_millis() as u64,
            })),
            Ok(Err(e)) => CheckResult::from_error(e),
            Err(_) => CheckResult::fail(format!(
                "database check timed out after {:?}",
                self.timeout
            )),
        }
    }
}

/// Bounds the run time of any other checker.
pub struct TimeoutCheck<C> {
    inner: C,
    timeout: Duration,
}

impl<C: Checker> TimeoutCheck<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl<C: Checker> Checker for TimeoutCheck<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn check(&self, cancel: &CancellationToken) -> CheckResult {
        let inner_cancel = cancel.child_token();

        match tokio::time::timeout(self.timeout, self.inner.check(&inner_cancel)).await {
            Ok(result) => result,
            Err(_) => {
                inner_cancel.cancel();
                CheckResult::fail(format!("check timed out after {:?}", self.timeout))
            }
        }
    }
}

/// Adapts an async closure into a checker.
pub struct FnCheck<F> {
    name: String,
    check_fn: F,
}

impl<F, Fut> FnCheck<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    pub fn new(name: impl Into<String>, check_fn: F) -> Self {
        Self {
            name: name.into(),
            check_fn,
        }
    }
}

#[async_trait::async_trait]
impl<F, Fut> Checker for FnCheck<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, cancel: &CancellationToken) -> CheckResult {
        (self.check_fn)(cancel.clone()).await
    }
}
