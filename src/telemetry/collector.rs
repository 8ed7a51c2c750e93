//! Prometheus-backed telemetry.

use super::statistics::SampleQuality;
use super::tracker::Telemetry;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed inside the Prometheus client.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Response time buckets, in seconds.
const RESPONSE_SECONDS_BUCKETS: &[f64] = &[0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.1, 1.0];

/// Entropy-per-byte buckets, in bits.
const ENTROPY_PER_BYTE_BUCKETS: &[f64] = &[1.0, 2.0, 3.0, 4.0, 4.5, 5.0, 5.5, 6.0, 6.5, 7.0, 7.5];

/// Mean deviation buckets, in byte-value units.
const MEAN_DEVIATION_BUCKETS: &[f64] = &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];

/// Prometheus registry holding every request and sample observation.
///
/// All metric handles are atomic, so a single tracker is shared by every
/// request task without further locking.
pub struct PrometheusTracker {
    registry: Registry,

    // Request metrics
    requests_total: IntCounter,
    responses_by_code: IntCounterVec,
    response_seconds: HistogramVec,

    // Device metrics
    system_entropy: Gauge,

    // Sample quality metrics
    entropy_per_byte: Histogram,
    mean_deviation: Histogram,
}

impl PrometheusTracker {
    /// Creates a tracker with all metrics registered in a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total =
            IntCounter::new("pollen_http_requests_total", "The total number of requests")?;
        let responses_by_code = IntCounterVec::new(
            Opts::new(
                "pollen_http_responses_codes",
                "Total responses sent to clients by code",
            ),
            &["code"],
        )?;
        let response_seconds = HistogramVec::new(
            HistogramOpts::new("pollen_http_response_seconds", "Response time by code")
                .buckets(RESPONSE_SECONDS_BUCKETS.to_vec()),
            &["code"],
        )?;

        let system_entropy = Gauge::new(
            "pollen_system_entropy",
            "System available entropy (entropy_avail)",
        )?;

        let entropy_per_byte = Histogram::with_opts(
            HistogramOpts::new(
                "pollen_response_entropy_per_byte",
                "Entropy per byte of the random data in response",
            )
            .buckets(ENTROPY_PER_BYTE_BUCKETS.to_vec()),
        )?;
        let mean_deviation = Histogram::with_opts(
            HistogramOpts::new(
                "pollen_response_entropy_arithmetic_mean_deviation",
                "Arithmetic mean deviation of the random data in response",
            )
            .buckets(MEAN_DEVIATION_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(responses_by_code.clone()))?;
        registry.register(Box::new(response_seconds.clone()))?;
        registry.register(Box::new(system_entropy.clone()))?;
        registry.register(Box::new(entropy_per_byte.clone()))?;
        registry.register(Box::new(mean_deviation.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            responses_by_code,
            response_seconds,
            system_entropy,
            entropy_per_byte,
            mean_deviation,
        })
    }

    /// Returns the number of requests counted so far.
    pub fn requests_total(&self) -> u64 {
        self.requests_total.get()
    }

    /// Returns the current device health gauge value.
    pub fn system_entropy_value(&self) -> f64 {
        self.system_entropy.get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Telemetry for PrometheusTracker {
    fn request_received(&self) {
        self.requests_total.inc();
    }

    fn response_sent(&self, status: u16, elapsed: Duration) {
        let code = status.to_string();
        self.responses_by_code.with_label_values(&[code.as_str()]).inc();
        self.response_seconds
            .with_label_values(&[code.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    fn system_entropy(&self, bits: f64) {
        self.system_entropy.set(bits);
    }

    fn sample_quality(&self, sample: &[u8]) {
        let quality = SampleQuality::analyze(sample);
        self.mean_deviation.observe(quality.mean_deviation);
        self.entropy_per_byte.observe(quality.entropy_per_byte);

        tracing::trace!(
            entropy_per_byte = quality.entropy_per_byte,
            chi_square = quality.chi_square,
            mean_deviation = quality.mean_deviation,
            "Sample scored"
        );
    }
}

impl std::fmt::Debug for PrometheusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusTracker")
            .field("requests_total", &self.requests_total.get())
            .finish_non_exhaustive()
    }
}
