//! Service configuration.
//!
//! Values come from built-in defaults, optionally overlaid by a TOML file,
//! then by command-line flags. The handler and supervisor only ever see
//! the final, validated [`ServerConfig`].

use crate::conduit::ConduitKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kernel estimate of bits in the input pool.
pub const ENTROPY_AVAIL_PATH: &str = "/proc/sys/kernel/random/entropy_avail";

/// Largest sample a single request may draw, in bytes.
pub const MAX_SAMPLE_SIZE: usize = 1024 * 1024;

/// Configuration for the whole service.
///
/// A port of `None` or `Some(0)` disables that listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Plaintext HTTP port.
    pub http_port: Option<u16>,
    /// TLS port.
    pub https_port: Option<u16>,
    /// Prometheus metrics port.
    pub metrics_port: Option<u16>,
    /// Random device used for reading and writing.
    pub device: PathBuf,
    /// Which conduit backs the service.
    pub conduit: ConduitKind,
    /// Bytes read from the conduit per request.
    pub bytes: usize,
    /// PEM certificate chain for the TLS listener.
    pub cert: PathBuf,
    /// PEM private key for the TLS listener.
    pub key: PathBuf,
    /// Device health indicator file.
    pub entropy_avail: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: Some(80),
            https_port: Some(443),
            metrics_port: None,
            device: PathBuf::from("/dev/random"),
            conduit: ConduitKind::Device,
            bytes: 64,
            cert: PathBuf::from("/etc/pollen/cert.pem"),
            key: PathBuf::from("/etc/pollen/key.pem"),
            entropy_avail: PathBuf::from(ENTROPY_AVAIL_PATH),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// The result is not validated: flags may still be applied on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Enabled plaintext port, if any.
    pub fn http_port(&self) -> Option<u16> {
        enabled(self.http_port)
    }

    /// Enabled TLS port, if any.
    pub fn https_port(&self) -> Option<u16> {
        enabled(self.https_port)
    }

    /// Enabled metrics port, if any.
    pub fn metrics_port(&self) -> Option<u16> {
        enabled(self.metrics_port)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_port().is_none() && self.https_port().is_none() {
            return Err(ConfigError::NoListeners);
        }
        if self.bytes == 0 {
            return Err(ConfigError::InvalidSampleSize);
        }
        if self.bytes > MAX_SAMPLE_SIZE {
            return Err(ConfigError::SampleTooLarge(self.bytes));
        }
        if cfg!(not(feature = "tls")) && self.https_port().is_some() {
            return Err(ConfigError::TlsUnavailable);
        }
        Ok(())
    }
}

fn enabled(port: Option<u16>) -> Option<u16> {
    port.filter(|&p| p != 0)
}

/// Parses a port setting. `""`, `off` and `0` disable the listener.
pub fn parse_port(value: &str) -> Result<Option<u16>, ConfigError> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    value
        .parse::<u16>()
        .map(|p| enabled(Some(p)))
        .map_err(|_| ConfigError::InvalidPort(value.to_string()))
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Both challenge listeners are disabled.
    #[error("nothing to do if http and https are both disabled")]
    NoListeners,
    /// `bytes` is zero.
    #[error("sample size must be at least one byte")]
    InvalidSampleSize,
    /// `bytes` is above [`MAX_SAMPLE_SIZE`].
    #[error("sample size of {0} bytes exceeds the limit of {} bytes", MAX_SAMPLE_SIZE)]
    SampleTooLarge(usize),
    /// A port setting is neither a number nor a disabling value.
    #[error("invalid port: {0}")]
    InvalidPort(String),
    /// HTTPS is configured in a build without the `tls` feature.
    #[error("an https port is configured but TLS support is not compiled in")]
    TlsUnavailable,
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.http_port(), Some(80));
        assert_eq!(config.https_port(), Some(443));
        assert_eq!(config.metrics_port(), None);
        assert_eq!(config.bytes, 64);
        assert_eq!(config.device, PathBuf::from("/dev/random"));
    }

    #[cfg(feature = "tls")]
    #[test]
    fn test_default_config_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_no_listeners_invalid() {
        let config = ServerConfig {
            http_port: None,
            https_port: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoListeners));
    }

    #[test]
    fn test_zero_sample_size_invalid() {
        let config = ServerConfig {
            https_port: None,
            bytes: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSampleSize));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("8080"), Ok(Some(8080)));
        assert_eq!(parse_port(""), Ok(None));
        assert_eq!(parse_port("off"), Ok(None));
        assert_eq!(parse_port("0"), Ok(None));
        assert!(matches!(parse_port("http"), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(parse_port("70000"), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_from_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "http_port = 8080\nhttps_port = 0\nmetrics_port = 9090\nconduit = \"software\"\nbytes = 128"
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();

        assert_eq!(config.http_port(), Some(8080));
        assert_eq!(config.https_port(), None);
        assert_eq!(config.metrics_port(), Some(9090));
        assert_eq!(config.conduit, ConduitKind::Software);
        assert_eq!(config.bytes, 128);
        assert_eq!(config.cert, PathBuf::from("/etc/pollen/cert.pem"));
    }

    #[test]
    fn test_from_file_defers_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_port = 0\nhttps_port = 0").unwrap();

        let mut config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::NoListeners));

        config.http_port = Some(8080);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_oversized_sample_invalid() {
        let config = ServerConfig {
            https_port: None,
            bytes: MAX_SAMPLE_SIZE + 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SampleTooLarge(MAX_SAMPLE_SIZE + 1)));

        let config = ServerConfig {
            https_port: None,
            bytes: MAX_SAMPLE_SIZE,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_from_file_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bytes = \"many\"").unwrap();

        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            ServerConfig::from_file("/nonexistent/pollen.toml"),
            Err(ConfigError::FileReadError(_))
        ));
    }
}
