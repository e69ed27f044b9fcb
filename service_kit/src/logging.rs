//! Logging bootstrap and request tracing
//!
//! [`init`] is meant to be called once from a binary's entry point. Library
//! code only emits `tracing` events and never installs a subscriber itself.

use crate::error::{KitError, Result};
use axum::{body::Body, Router};
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::info_span;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = KitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(KitError::Config(format!("invalid log level: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogProfile {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub profile: LogProfile,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            profile: LogProfile::Prod,
        }
    }
}

impl LogConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        match self.profile {
            LogProfile::Dev => format!("{},tower_http=debug", self.level),
            LogProfile::Prod => self.level.to_string(),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let dev = config.profile == LogProfile::Dev;
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(dev)
        .with_file(dev)
        .with_line_number(dev);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json().flatten_event(true))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .try_init(),
    };

    installed.map_err(|e| KitError::Config(format!("failed to install logger: {}", e)))?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        profile = ?config.profile,
        "Logging initialized"
    );

    Ok(())
}

/// Wraps `router` with request tracing: a span per request carrying method and
/// path, and one event per response with status and latency.
pub fn trace_http(router: Router) -> Router {
    let layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &tracing::Span| {
            tracing::debug!(
                "started processing request {} {}",
                request.method(),
                request.uri().path()
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &tracing::Span| {
                let status = response.status();
                let latency_ms = latency.as_millis() as u64;

                if status.is_server_error() {
                    tracing::warn!(status = status.as_u16(), latency_ms, "request completed");
                } else {
                    tracing::info!(status = status.as_u16(), latency_ms, "request completed");
                }
            },
        )
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(
                    latency_ms = latency.as_millis() as u64,
                    error = ?error,
                    "request failed"
                );
            },
        );

    router.layer(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing_is_case_insensitive() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
    }

    #[test]
    fn test_invalid_log_level() {
        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert!(matches!(err, KitError::Config(_)));
        assert!(err.to_string().contains("invalid log level"));
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.profile, LogProfile::Prod);
        assert_eq!(config.filter_directive(), "info");
    }

    #[test]
    fn test_dev_profile_filter_directive() {
        let config = LogConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            profile: LogProfile::Dev,
        };
        assert_eq!(config.filter_directive(), "debug,tower_http=debug");
    }

    #[test]
    fn test_log_config_deserializes_lowercase_values() {
        let config: LogConfig =
            serde_json::from_str(r#"{"level":"warn","format":"pretty","profile":"dev"}"#).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.profile, LogProfile::Dev);
    }
}
