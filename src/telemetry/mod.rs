//! Sample quality scoring and observation sinks.
//!
//! Every request reports into a [`Telemetry`] implementation chosen once
//! at startup. With a metrics port configured that is a
//! [`PrometheusTracker`]; without one it is [`NullTelemetry`], and every
//! observation is dropped.
//!
//! # Metrics Exposed
//!
//! ## Request Metrics
//! - `pollen_http_requests_total` - Requests received
//! - `pollen_http_responses_codes{code}` - Responses sent, by status code
//! - `pollen_http_response_seconds{code}` - Response time, by status code
//!
//! ## Device Metrics
//! - `pollen_system_entropy` - Kernel `entropy_avail` after the last request
//!
//! ## Sample Quality Metrics
//! - `pollen_response_entropy_per_byte` - Shannon entropy of each sample
//! - `pollen_response_entropy_arithmetic_mean_deviation` - Mean byte bias of each sample
//!
//! # Example
//!
//! ```
//! use pollen::telemetry::{PrometheusTracker, Telemetry};
//! use std::time::Duration;
//!
//! let tracker = PrometheusTracker::new().expect("Failed to create tracker");
//!
//! tracker.request_received();
//! tracker.sample_quality(&[0x5a; 64]);
//! tracker.response_sent(200, Duration::from_micros(420));
//!
//! assert_eq!(tracker.requests_total(), 1);
//! ```

mod collector;
mod statistics;
mod tracker;

pub use collector::{MetricsError, PrometheusTracker};
pub use statistics::{
    arithmetic_mean_deviation, chi_square, entropy_per_byte, SampleQuality, BYTE_MIDPOINT,
};
pub use tracker::{NullTelemetry, Telemetry};
