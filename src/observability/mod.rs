//! Observability: structured logging and in-process metrics

pub mod logging;
pub mod metrics;

pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{metrics, AttemptKind, MetricsSnapshot, RouterMetrics};

pub use logging::router_span;
