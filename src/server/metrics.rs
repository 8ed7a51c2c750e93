//! HTTP server for the Prometheus metrics endpoint.

use super::{ListenerKind, ServerError};
use crate::telemetry::PrometheusTracker;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;

/// Path the metrics are exposed on.
pub const METRICS_PATH: &str = "/metrics";

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// HTTP server exposing a tracker's metrics.
pub struct MetricsServer {
    config: MetricsServerConfig,
    tracker: Arc<PrometheusTracker>,
}

impl MetricsServer {
    /// Creates a new metrics server over a shared tracker.
    pub fn new(config: MetricsServerConfig, tracker: Arc<PrometheusTracker>) -> Self {
        Self { config, tracker }
    }

    /// Builds the metrics router.
    pub fn router(&self) -> Router {
        Router::new()
            .route(METRICS_PATH, get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(Arc::clone(&self.tracker))
    }

    /// Starts the HTTP server.
    ///
    /// Runs until the server fails; it never returns `Ok` on its own.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();
        let addr = self.config.bind_addr;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(%addr, "Metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve {
                listener: ListenerKind::Metrics,
                message: e.to_string(),
            })
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(tracker): State<Arc<PrometheusTracker>>) -> impl IntoResponse {
    match tracker.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Telemetry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_config_with_port() {
        let config = MetricsServerConfig::with_port(8080);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let tracker = Arc::new(PrometheusTracker::new().unwrap());
        tracker.request_received();

        let server = MetricsServer::new(MetricsServerConfig::with_port(9090), Arc::clone(&tracker));
        let response = server
            .router()
            .oneshot(Request::builder().uri(METRICS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("pollen_http_requests_total 1"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let tracker = Arc::new(PrometheusTracker::new().unwrap());
        let server = MetricsServer::new(MetricsServerConfig::with_port(9090), tracker);

        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
