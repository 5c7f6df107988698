//! Prometheus metrics and structured logging for paperdesk.
//!
//! Provides observability for both halves of the system:
//! - Prometheus metrics for feed health, cache effectiveness, trade flow
//! - Structured JSON logging with tracing
//! - Text-format metrics export for the server scrape endpoint

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{gather_metrics, Metrics};
