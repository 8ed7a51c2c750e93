//! Device health indicator.
//!
//! Reads the kernel's estimate of available entropy. Only the first line
//! of the indicator file is significant. Every failure here is non-fatal
//! to the request that triggered the read.

use crate::config::ENTROPY_AVAIL_PATH;
use std::path::PathBuf;
use thiserror::Error;

/// Placeholder logged when no reading is available.
pub const UNKNOWN_READING: &str = "?";

/// Errors that can occur while sampling the health indicator.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The indicator file could not be read.
    #[error("cannot read health indicator: {0}")]
    Read(#[from] std::io::Error),
    /// The indicator's first line is blank.
    #[error("health indicator is empty")]
    Empty,
    /// The reading does not parse as a finite number.
    #[error("health indicator is not numeric: {0:?}")]
    NotNumeric(String),
}

/// A single reading of the health indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReading {
    first_line: String,
}

impl HealthReading {
    /// Builds a reading from the indicator's raw contents.
    pub fn parse(content: &str) -> Result<Self, HealthError> {
        let first_line = content.lines().next().unwrap_or_default().trim();
        if first_line.is_empty() {
            return Err(HealthError::Empty);
        }
        Ok(Self {
            first_line: first_line.to_string(),
        })
    }

    /// The reading as it appeared in the indicator.
    pub fn as_str(&self) -> &str {
        &self.first_line
    }

    /// The reading as a number.
    ///
    /// Only finite decimal values are accepted; anything else leaves the
    /// health gauge untouched.
    pub fn value(&self) -> Result<f64, HealthError> {
        self.first_line
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| HealthError::NotNumeric(self.first_line.clone()))
    }
}

/// Reads the health indicator from a fixed path.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    path: PathBuf,
}

impl HealthProbe {
    /// Creates a probe for the indicator file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Takes a reading. Blocks on file I/O.
    pub fn read(&self) -> Result<HealthReading, HealthError> {
        let content = std::fs::read_to_string(&self.path)?;
        HealthReading::parse(&content)
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new(ENTROPY_AVAIL_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn probe_with(content: &str) -> (tempfile::NamedTempFile, HealthProbe) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let probe = HealthProbe::new(file.path());
        (file, probe)
    }

    #[test]
    fn test_reads_first_line() {
        let (_file, probe) = probe_with("3021\nignored\n");
        let reading = probe.read().unwrap();

        assert_eq!(reading.as_str(), "3021");
        assert_eq!(reading.value().unwrap(), 3021.0);
    }

    #[test]
    fn test_non_numeric_reading() {
        let (_file, probe) = probe_with("lots\n");
        let reading = probe.read().unwrap();

        assert_eq!(reading.as_str(), "lots");
        assert!(matches!(reading.value(), Err(HealthError::NotNumeric(_))));
    }

    #[test]
    fn test_non_finite_reading_rejected() {
        let reading = HealthReading::parse("NaN").unwrap();
        assert!(reading.value().is_err());
    }

    #[test]
    fn test_empty_indicator() {
        let (_file, probe) = probe_with("\n");
        assert!(matches!(probe.read(), Err(HealthError::Empty)));
    }

    #[test]
    fn test_missing_indicator() {
        let probe = HealthProbe::new("/nonexistent/entropy_avail");
        assert!(matches!(probe.read(), Err(HealthError::Read(_))));
    }
}
