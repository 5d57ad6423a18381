//! In-process metrics.
//!
//! Metrics are stored as atomics, injected into the components that record
//! them, and rendered by the `/metrics` handler in Prometheus text format.

pub mod metrics;

pub use metrics::{InFlightGuard, ServiceMetrics};
