//! Service supervision.
//!
//! The supervisor opens the shared conduit, picks the telemetry
//! implementation, and starts every configured listener on its own task.
//! Listeners share nothing that would make partial service meaningful, so
//! the first listener to stop for any reason stops the whole service.

mod listener;
mod metrics;

pub use listener::{bind_addr, serve_plain};
#[cfg(feature = "tls")]
pub use listener::serve_tls;
pub use metrics::{MetricsServer, MetricsServerConfig, METRICS_PATH};

use crate::conduit::{self, ConduitError};
use crate::config::{ConfigError, ServerConfig};
use crate::handler::{self, HealthProbe, PollenHandler};
use crate::telemetry::{MetricsError, NullTelemetry, PrometheusTracker, Telemetry};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

/// The listeners the supervisor can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// Plaintext challenge listener.
    Http,
    /// TLS challenge listener.
    Https,
    /// Prometheus scrape listener.
    Metrics,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListenerKind::Http => "http",
            ListenerKind::Https => "https",
            ListenerKind::Metrics => "metrics",
        })
    }
}

/// Errors that stop the service.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The conduit could not be opened.
    #[error("cannot open conduit: {0}")]
    Conduit(#[from] ConduitError),

    /// The metrics registry could not be built.
    #[error("cannot create metrics: {0}")]
    Metrics(#[from] MetricsError),

    /// A listener could not bind its address.
    #[error("failed to bind to address {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TLS certificate or key could not be loaded.
    #[error("failed to load TLS certificate or key: {0}")]
    Tls(#[source] std::io::Error),

    /// A running listener failed.
    #[error("{listener} listener failed: {message}")]
    Serve {
        /// Which listener failed.
        listener: ListenerKind,
        /// Error reported by the server.
        message: String,
    },

    /// A listener stopped without an error.
    #[error("{0} listener exited")]
    Exited(ListenerKind),

    /// A listener task panicked or was cancelled.
    #[error("listener task failed: {0}")]
    Task(String),
}

/// Runs every configured listener until one of them stops.
#[derive(Debug)]
pub struct Supervisor {
    config: ServerConfig,
}

impl Supervisor {
    /// Creates a supervisor, rejecting configurations with nothing to serve.
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Starts all listeners and waits for the first one to stop.
    ///
    /// Never returns `Ok`: a listener stopping, cleanly or not, is a
    /// service failure.
    pub async fn run(self) -> Result<Infallible, ServerError> {
        let config = self.config;

        let conduit = conduit::open(config.conduit, &config.device)?;

        let tracker = match config.metrics_port() {
            Some(_) => Some(Arc::new(PrometheusTracker::new()?)),
            None => None,
        };
        let telemetry: Arc<dyn Telemetry> = match &tracker {
            Some(tracker) => tracker.clone(),
            None => Arc::new(NullTelemetry),
        };

        let handler = Arc::new(PollenHandler::new(
            conduit,
            telemetry,
            HealthProbe::new(config.entropy_avail.clone()),
            config.bytes,
        ));
        let app = handler::router(handler);

        let mut listeners = JoinSet::new();

        if let Some(port) = config.http_port() {
            let app = app.clone();
            listeners.spawn(async move {
                (ListenerKind::Http, serve_plain(bind_addr(port), app).await)
            });
        }

        #[cfg(feature = "tls")]
        if let Some(port) = config.https_port() {
            let app = app.clone();
            let cert = config.cert.clone();
            let key = config.key.clone();
            listeners.spawn(async move {
                (
                    ListenerKind::Https,
                    serve_tls(bind_addr(port), app, &cert, &key).await,
                )
            });
        }

        if let (Some(port), Some(tracker)) = (config.metrics_port(), tracker) {
            let server = MetricsServer::new(MetricsServerConfig::with_port(port), tracker);
            listeners.spawn(async move { (ListenerKind::Metrics, server.run().await) });
        }

        tracing::info!(
            listeners = listeners.len(),
            read_size = config.bytes,
            "pollen serving"
        );

        match listeners.join_next().await {
            Some(Ok((kind, Ok(())))) => Err(ServerError::Exited(kind)),
            Some(Ok((_, Err(e)))) => Err(e),
            Some(Err(e)) => Err(ServerError::Task(e.to_string())),
            None => Err(ServerError::Config(ConfigError::NoListeners)),
        }
    }
}

/// Logs at critical severity and terminates the process.
///
/// Diagnostics that should not stop the service go through the ordinary
/// `tracing` macros instead.
pub fn fatal(err: &dyn std::error::Error) -> ! {
    tracing::error!(severity = "critical", error = %err, "pollen stopping");
    eprintln!("pollen: {err}");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conduit::ConduitKind;
    use std::path::PathBuf;

    #[test]
    fn test_supervisor_rejects_no_listeners() {
        let config = ServerConfig {
            http_port: None,
            https_port: None,
            ..Default::default()
        };

        assert!(matches!(
            Supervisor::new(config),
            Err(ConfigError::NoListeners)
        ));
    }

    #[tokio::test]
    async fn test_missing_device_stops_startup() {
        let config = ServerConfig {
            https_port: None,
            device: PathBuf::from("/nonexistent/pollen/random"),
            ..Default::default()
        };

        let result = Supervisor::new(config).unwrap().run().await;

        assert!(matches!(result, Err(ServerError::Conduit(_))));
    }

    #[tokio::test]
    async fn test_listener_failure_stops_service() {
        // Occupy a port so the plaintext listener cannot bind
        let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = ServerConfig {
            http_port: Some(port),
            https_port: None,
            conduit: ConduitKind::Software,
            ..Default::default()
        };

        let result = Supervisor::new(config).unwrap().run().await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn test_listener_kind_display() {
        assert_eq!(ServerError::Exited(ListenerKind::Metrics).to_string(), "metrics listener exited");
    }
}
