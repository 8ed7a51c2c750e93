//! Challenge-response request handling.
//!
//! Each request runs the same strictly ordered sequence:
//!
//! ```text
//! validate → digest → seed conduit → health before → draw sample
//!          → score → respond → health after
//! ```
//!
//! Only two failures reach the client: a missing challenge (400) and a
//! failed or short conduit read (500). A failed conduit write or health
//! read is logged and the request carries on, since some fresh random
//! bytes are better than none.

mod health;
mod routes;

pub use health::{HealthError, HealthProbe, HealthReading, UNKNOWN_READING};
pub use routes::router;

use crate::conduit::{Conduit, ConduitError};
use crate::telemetry::Telemetry;
use axum::http::StatusCode;
use sha2::{Digest, Sha512};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Body of a 400 response.
pub const USE_POLLINATE_ERROR: &str = "Please use the pollinate client.  'sudo apt-get install pollinate' or download from: https://bazaar.launchpad.net/~pollinate/pollinate/trunk/view/head:/pollinate";

/// Body of a 500 response.
pub const DEVICE_READ_ERROR: &str = "Failed to read from random device";

/// Longest client description written to the log.
const MAX_CLIENT_LEN: usize = 128;

/// Who sent a request, for logging only.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Peer address, when the listener reports one.
    pub addr: Option<SocketAddr>,
    /// `User-Agent` header, if sent.
    pub user_agent: Option<String>,
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self
            .addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let described = format!("{}, {}", addr, self.user_agent.as_deref().unwrap_or(""));
        let truncated: String = described.chars().take(MAX_CLIENT_LEN).collect();
        f.write_str(&truncated)
    }
}

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The challenge was mixed in and a sample drawn. Both digests are hex.
    Seeded {
        /// SHA-512 of the challenge.
        challenge_digest: String,
        /// SHA-512 of the challenge followed by the sample.
        response_digest: String,
    },
    /// No challenge was supplied.
    BadRequest,
    /// The conduit could not supply a full sample.
    DeviceFailure,
}

impl Reply {
    /// HTTP status for this reply.
    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Seeded { .. } => StatusCode::OK,
            Reply::BadRequest => StatusCode::BAD_REQUEST,
            Reply::DeviceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body, newline terminated.
    pub fn body(&self) -> String {
        match self {
            Reply::Seeded {
                challenge_digest,
                response_digest,
            } => format!("{challenge_digest}\n{response_digest}\n"),
            Reply::BadRequest => format!("{USE_POLLINATE_ERROR}\n"),
            Reply::DeviceFailure => format!("{DEVICE_READ_ERROR}\n"),
        }
    }
}

/// Serves challenges against one shared conduit.
pub struct PollenHandler {
    conduit: Arc<dyn Conduit>,
    telemetry: Arc<dyn Telemetry>,
    health: HealthProbe,
    read_size: usize,
}

impl PollenHandler {
    /// Creates a handler. `read_size` is fixed for the handler's lifetime.
    pub fn new(
        conduit: Arc<dyn Conduit>,
        telemetry: Arc<dyn Telemetry>,
        health: HealthProbe,
        read_size: usize,
    ) -> Self {
        Self {
            conduit,
            telemetry,
            health,
            read_size,
        }
    }

    /// Handles one challenge.
    pub async fn handle(&self, challenge: Option<&str>, client: &ClientInfo) -> Reply {
        let started = Instant::now();
        self.telemetry.request_received();

        let Some(challenge) = challenge.filter(|c| !c.is_empty()) else {
            return self.finish(Reply::BadRequest, started);
        };

        let mut checksum = Sha512::new();
        checksum.update(challenge.as_bytes());
        let challenge_digest = checksum.clone().finalize();

        let conduit = Arc::clone(&self.conduit);
        let seed = challenge_digest.to_vec();
        if let Err(e) = offload(move || conduit.write(&seed)).await {
            tracing::error!(error = %e, at = unix_nanos(), "Cannot write to random device");
        }

        let before = self.read_health().await;
        tracing::info!(
            client = %client,
            at = unix_nanos(),
            entropy_avail = %reading_label(&before),
            "Server received challenge"
        );

        let conduit = Arc::clone(&self.conduit);
        let read_size = self.read_size;
        let sample = match offload(move || conduit.read_full(read_size)).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::error!(error = %e, at = unix_nanos(), "Cannot read from random device");
                return self.finish(Reply::DeviceFailure, started);
            }
        };

        self.telemetry.sample_quality(&sample);

        // The response line is for print-ability when debugging.
        // It continues the challenge checksum over the sample.
        checksum.update(&sample);
        let response_digest = checksum.finalize();

        let reply = self.finish(
            Reply::Seeded {
                challenge_digest: to_hex(&challenge_digest),
                response_digest: to_hex(&response_digest),
            },
            started,
        );

        let after = self.read_health().await;
        if let Some(reading) = &after {
            match reading.value() {
                Ok(bits) => self.telemetry.system_entropy(bits),
                Err(e) => tracing::warn!(error = %e, "Health reading not recorded"),
            }
        }

        tracing::info!(
            client = %client,
            at = unix_nanos(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            entropy_avail = %reading_label(&after),
            "Server sent response"
        );

        reply
    }

    fn finish(&self, reply: Reply, started: Instant) -> Reply {
        self.telemetry
            .response_sent(reply.status().as_u16(), started.elapsed());
        reply
    }

    async fn read_health(&self) -> Option<HealthReading> {
        let probe = self.health.clone();
        let result = tokio::task::spawn_blocking(move || probe.read()).await;

        match result {
            Ok(Ok(reading)) => Some(reading),
            Ok(Err(e)) => {
                tracing::error!(error = %e, at = unix_nanos(), "Cannot record entropy bits");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Health probe task failed");
                None
            }
        }
    }
}

impl fmt::Debug for PollenHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollenHandler")
            .field("read_size", &self.read_size)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

/// Runs a blocking conduit operation off the async workers.
async fn offload<T, F>(op: F) -> Result<T, ConduitError>
where
    F: FnOnce() -> Result<T, ConduitError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ConduitError::Task(e.to_string()))?
}

fn reading_label(reading: &Option<HealthReading>) -> &str {
    reading
        .as_ref()
        .map(HealthReading::as_str)
        .unwrap_or(UNKNOWN_READING)
}

fn unix_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
