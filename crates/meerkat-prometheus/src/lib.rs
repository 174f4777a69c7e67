//! Prometheus metrics for the meerkat operator.
//!
//! [`PrometheusMetrics`] is a [`meerkat_core::Subscribe`] implementation: hand it
//! to the operator builder and it turns operator events into metrics.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use meerkat_core::{Operator, OperatorConfig, Subscribe};
//! use meerkat_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let operator = Operator::builder(OperatorConfig::default())
//!     .with_subscribers(vec![Arc::new(metrics.clone()) as Arc<dyn Subscribe>])
//!     .build()?;
//!
//! let text = metrics.encode_text()?;
//! # let _ = (operator, text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `meerkat_cycles_total{kind}` - Counter
//! - `meerkat_cycle_failures_total{kind}` - Counter
//! - `meerkat_cycle_duration_seconds{kind}` - Histogram
//! - `meerkat_check_failures_total{monitor}` - Counter
//! - `meerkat_heartbeat_failures_total{monitor}` - Counter
//! - `meerkat_alarms_total{monitor}` - Counter
//! - `meerkat_timer_delay_seconds` - Gauge
//! - `meerkat_operator_running` - Gauge (0/1)
//!
//! ## HTTP Server
//! No `/metrics` endpoint is provided; serve [`PrometheusMetrics::encode_text`]
//! from whatever HTTP stack the application already runs.

mod backend;
pub use backend::PrometheusMetrics;

mod error;
pub use error::MetricsError;

pub use prometheus::{Encoder, Registry, TextEncoder};
