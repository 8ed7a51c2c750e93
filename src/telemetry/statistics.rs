//! Distributional scores over a byte sample.
//!
//! These are diagnostics for spotting a degraded device, not proofs of
//! randomness. A uniformly random 64-byte sample typically scores
//! 5.6-5.9 bits of entropy per byte, because 64 draws cannot cover 256
//! symbols.
//!
//! Every function here is pure: the result depends only on the bytes
//! passed in. An empty sample scores 0 on every measure.

/// Midpoint of the byte range, the expected mean of uniform bytes.
pub const BYTE_MIDPOINT: f64 = 127.5;

/// Scores for a single sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuality {
    /// Shannon entropy in bits per byte, in `[0, 8]`.
    pub entropy_per_byte: f64,
    /// Chi-square statistic against a uniform byte distribution.
    pub chi_square: f64,
    /// Absolute distance of the mean byte value from 127.5.
    pub mean_deviation: f64,
    /// Number of bytes scored.
    pub sample_size: usize,
}

impl SampleQuality {
    /// Runs every score over the sample.
    pub fn analyze(data: &[u8]) -> Self {
        Self {
            entropy_per_byte: entropy_per_byte(data),
            chi_square: chi_square(data),
            mean_deviation: arithmetic_mean_deviation(data),
            sample_size: data.len(),
        }
    }
}

fn byte_histogram(data: &[u8]) -> [u64; 256] {
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    counts
}

/// Shannon entropy of the byte distribution, in bits per byte.
pub fn entropy_per_byte(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let n = data.len() as f64;
    byte_histogram(data)
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * (1.0 / p).log2()
        })
        .sum()
}

/// Chi-square statistic of the byte histogram against a uniform distribution.
///
/// Lower is more uniform. Zero only when every byte value occurs exactly
/// `len / 256` times.
pub fn chi_square(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let expected = data.len() as f64 / 256.0;
    byte_histogram(data)
        .iter()
        .map(|&observed| (expected - observed as f64).powi(2) / expected)
        .sum()
}

/// Absolute deviation of the mean byte value from [`BYTE_MIDPOINT`].
pub fn arithmetic_mean_deviation(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let sum: u64 = data.iter().map(|&b| b as u64).sum();
    (BYTE_MIDPOINT - sum as f64 / data.len() as f64).abs()
}
