use crate::error::{KitError, Result};
use crate::health::{Checker, DbCheck, HealthServiceConfig, UrlCheck};
use crate::logging::LogConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceConfig,
    pub log: LogConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub description: String,
    pub version: String,
    pub commit: String,
    /// 0 disables the service-wide per-check timeout.
    pub check_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksConfig {
    #[serde(default)]
    pub urls: Vec<UrlCheckConfig>,
    #[serde(default)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlCheckConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_url_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_valid_status_codes")]
    pub valid_status_codes: Vec<u16>,
}

/// Report key of the check built from `checks.database_url`.
pub const DATABASE_CHECK_NAME: &str = "database";

fn default_url_timeout_ms() -> u64 {
    5000
}

fn default_valid_status_codes() -> Vec<u16> {
    vec![200, 201, 202, 204]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            service: ServiceConfig::default(),
            log: LogConfig::default(),
            checks: ChecksConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            description: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: "unknown".to_string(),
            check_timeout_ms: 0,
        }
    }
}

impl AppConfig {
    /// Defaults, then `config.toml` if present, then `APP_` environment
    /// variables (`APP_SERVER__PORT=9000`).
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(KitError::Config("Server port cannot be 0".to_string()));
        }

        if self.service.name.trim().is_empty() {
            return Err(KitError::Config("Service name cannot be empty".to_string()));
        }

        let mut names = HashSet::new();
        for check in &self.checks.urls {
            if check.name.trim().is_empty() {
                return Err(KitError::Config(
                    "URL check name cannot be empty".to_string(),
                ));
            }

            if check.url.trim().is_empty() {
                return Err(KitError::Config(format!(
                    "URL check '{}' has no target URL",
                    check.name
                )));
            }

            if check.timeout_ms == 0 {
                return Err(KitError::Config(format!(
                    "URL check '{}' timeout must be greater than 0",
                    check.name
                )));
            }

            if !names.insert(check.name.as_str()) {
                return Err(KitError::Config(format!(
                    "Duplicate check name '{}'",
                    check.name
                )));
            }
        }

        if let Some(url) = &self.checks.database_url {
            if url.trim().is_empty() {
                return Err(KitError::Config(
                    "Database URL cannot be empty when set".to_string(),
                ));
            }

            if names.contains(DATABASE_CHECK_NAME) {
                return Err(KitError::Config(format!(
                    "Duplicate check name '{}': reserved for the database check",
                    DATABASE_CHECK_NAME
                )));
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Builds the health service configuration, constructing every configured check.
    /// The database pool connects lazily, so an unreachable database surfaces as a
    /// failing check rather than a startup error.
    pub fn health_service_config(&self) -> Result<HealthServiceConfig> {
        let mut checks: Vec<Arc<dyn Checker>> = Vec::with_capacity(self.checks.urls.len() + 1);

        for url_check in &self.checks.urls {
            let check = UrlCheck::new(url_check.name.clone(), &url_check.url)?
                .with_timeout(Duration::from_millis(url_check.timeout_ms))
                .with_valid_status_codes(url_check.valid_status_codes.clone());
            checks.push(Arc::new(check));
        }

        if let Some(database_url) = &self.checks.database_url {
            let pool = sqlx::SqlitePool::connect_lazy(database_url)
                .map_err(|e| KitError::Config(format!("invalid database URL: {}", e)))?;
            checks.push(Arc::new(DbCheck::new(DATABASE_CHECK_NAME, pool)));
        }

        let check_timeout = match self.service.check_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(HealthServiceConfig {
            name: self.service.name.clone(),
            description: self.service.description.clone(),
            version: self.service.version.clone(),
            commit: self.service.commit.clone(),
            checks,
            clock: None,
            check_timeout,
        })
    }
}
