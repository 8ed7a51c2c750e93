//! The telemetry capability seen by request handling.

use std::time::Duration;

/// Observation sinks for request handling.
///
/// Call sites invoke every method unconditionally. Whether anything is
/// recorded depends only on which implementation was chosen at startup.
/// Implementations must be safe for concurrent use from many requests.
pub trait Telemetry: Send + Sync {
    /// Counts an inbound request.
    fn request_received(&self);

    /// Records the response status and how long the request took.
    fn response_sent(&self, status: u16, elapsed: Duration);

    /// Sets the device health gauge to a point-in-time reading.
    fn system_entropy(&self, bits: f64);

    /// Scores a sample drawn from the conduit and records the scores.
    fn sample_quality(&self, sample: &[u8]);
}

/// Telemetry that records nothing. Used when no metrics port is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn request_received(&self) {}

    fn response_sent(&self, _status: u16, _elapsed: Duration) {}

    fn system_entropy(&self, _bits: f64) {}

    fn sample_quality(&self, _sample: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_null_telemetry_accepts_everything() {
        let telemetry: Arc<dyn Telemetry> = Arc::new(NullTelemetry);

        telemetry.request_received();
        telemetry.response_sent(200, Duration::from_millis(3));
        telemetry.system_entropy(256.0);
        telemetry.sample_quality(&[0u8; 64]);
    }
}
