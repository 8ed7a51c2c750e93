//! Pollen server binary.
//!
//! Loads configuration from defaults, an optional TOML file and flags,
//! then runs every configured listener until one of them stops.

use clap::Parser;
use pollen::{
    config::{parse_port, ConfigError, ServerConfig},
    conduit::ConduitKind,
    server::{fatal, Supervisor},
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pollen", version, about = "Entropy-as-a-service challenge server")]
struct Cli {
    /// TOML configuration file, applied before any flag
    #[arg(long)]
    config: Option<PathBuf>,

    /// Plaintext HTTP port ("", "off" or 0 disables)
    #[arg(long)]
    http_port: Option<String>,

    /// HTTPS port ("", "off" or 0 disables)
    #[arg(long)]
    https_port: Option<String>,

    /// Prometheus metrics port ("", "off" or 0 disables)
    #[arg(long)]
    metrics_port: Option<String>,

    /// Random device to write challenges to and read samples from
    #[arg(long)]
    device: Option<PathBuf>,

    /// Conduit backing the service
    #[arg(long, value_enum)]
    conduit: Option<ConduitKind>,

    /// Bytes read from the device per request
    #[arg(long)]
    bytes: Option<usize>,

    /// PEM certificate chain for the HTTPS listener
    #[arg(long)]
    cert: Option<PathBuf>,

    /// PEM private key for the HTTPS listener
    #[arg(long)]
    key: Option<PathBuf>,

    /// Device health indicator file
    #[arg(long)]
    entropy_avail: Option<PathBuf>,
}

impl Cli {
    /// Builds the effective configuration. Flags win over the file.
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(port) = &self.http_port {
            config.http_port = parse_port(port)?;
        }
        if let Some(port) = &self.https_port {
            config.https_port = parse_port(port)?;
        }
        if let Some(port) = &self.metrics_port {
            config.metrics_port = parse_port(port)?;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(conduit) = self.conduit {
            config.conduit = conduit;
        }
        if let Some(bytes) = self.bytes {
            config.bytes = bytes;
        }
        if let Some(cert) = self.cert {
            config.cert = cert;
        }
        if let Some(key) = self.key {
            config.key = key;
        }
        if let Some(path) = self.entropy_avail {
            config.entropy_avail = path;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let supervisor = match cli.into_config().and_then(Supervisor::new) {
        Ok(supervisor) => supervisor,
        Err(e) => fatal(&e),
    };

    let config = supervisor.config();
    info!(
        version = pollen::VERSION,
        started_ns = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        http_port = ?config.http_port(),
        https_port = ?config.https_port(),
        metrics_port = ?config.metrics_port(),
        device = %config.device.display(),
        conduit = ?config.conduit,
        bytes = config.bytes,
        "Pollen starting"
    );

    match supervisor.run().await {
        Err(e) => fatal(&e),
        Ok(never) => match never {},
    }
}
