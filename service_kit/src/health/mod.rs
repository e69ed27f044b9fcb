pub mod checks;
pub mod handler;
pub mod service;


pub use checks::{
    CheckResult, Checker, DbCheck, FnCheck, HealthReport, HealthStatus, StubCheck, TimeoutCheck,
    UrlCheck,
};
pub use handler::{health_handler, health_routes};
pub use service::{HealthService, HealthServiceConfig};
