pub mod settings;

pub use settings::{AppConfig, ChecksConfig, ServerConfig, ServiceConfig, UrlCheckConfig};
