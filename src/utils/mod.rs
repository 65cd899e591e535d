//! # Utility Modules
//!
//! Supporting utilities for logging, timing, identifiers and observability.
//!
//! ## Components
//! - **Id generation**: monotonically increasing packet ids
//! - **Logging**: `tracing-subscriber` setup from
//!   [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: per-client atomic counters
//! - **Timeout**: async timeout wrappers and protocol default durations

pub mod idgen;
pub mod logging;
pub mod metrics;
pub mod timeout;

pub use idgen::IdGenerator;
pub use metrics::{Metrics, MetricsSnapshot};
