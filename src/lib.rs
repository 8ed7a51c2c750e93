//! Pollen: entropy as a service.
//!
//! Clients send a challenge string. The server hashes it with SHA-512,
//! writes the digest into a shared randomness device, reads a fixed-size
//! sample back, and answers with the challenge digest and a digest of the
//! fresh sample. Every sample is scored for obvious signs of a degraded
//! device and the scores are exported as Prometheus metrics.
//!
//! # Architecture
//!
//! ```text
//!  request → handler → conduit (write digest, read sample)
//!               ↓
//!           telemetry (score sample, record outcome)
//! ```
//!
//! The [`server::Supervisor`] runs the plaintext, TLS and metrics
//! listeners side by side over one handler and one conduit.
//!
//! # Design Principles
//!
//! - **Trusts the device**: client challenges only add defense in depth
//! - **Partial service over refusal**: write and health failures are logged, not returned
//! - **Stateless**: nothing persists across requests or restarts
//! - **No cryptographic claims**: quality scores are diagnostics, not proofs
//!
//! # Example
//!
//! ```no_run
//! use pollen::{
//!     conduit::SoftConduit,
//!     handler::{ClientInfo, HealthProbe, PollenHandler},
//!     telemetry::PrometheusTracker,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let tracker = Arc::new(PrometheusTracker::new().unwrap());
//! let handler = PollenHandler::new(
//!     Arc::new(SoftConduit::from_os_entropy()),
//!     tracker.clone(),
//!     HealthProbe::default(),
//!     64,
//! );
//!
//! let reply = handler.handle(Some("hello"), &ClientInfo::default()).await;
//! print!("{}", reply.body());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod conduit;
pub mod config;
pub mod handler;
pub mod server;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use conduit::{Conduit, ConduitError, ConduitKind, DeviceConduit, MockConduit, SoftConduit};
pub use config::{ConfigError, ServerConfig};
pub use handler::{ClientInfo, PollenHandler, Reply};
pub use server::{ServerError, Supervisor};
pub use telemetry::{NullTelemetry, PrometheusTracker, SampleQuality, Telemetry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
