//! Observability: structured logging, metrics and health routes

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{health_routes, HealthMonitor};
pub use logging::{init_default_logging, init_logging, parse_level, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};

pub use logging::{session_span, turn_span, worker_span};
