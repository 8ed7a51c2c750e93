//! Plaintext and TLS listeners for the challenge router.

use super::{ListenerKind, ServerError};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Address a listener binds for `port`, on every interface.
pub fn bind_addr(port: u16) -> SocketAddr {
    ([0, 0, 0, 0], port).into()
}

/// Serves `app` over plaintext HTTP until the server fails.
pub async fn serve_plain(addr: SocketAddr, app: Router) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(%addr, "HTTP listener started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ServerError::Serve {
        listener: ListenerKind::Http,
        message: e.to_string(),
    })
}

/// Serves `app` over TLS until the server fails.
///
/// Certificate and key are PEM files. rustls negotiates TLS 1.2 or 1.3
/// only, which sets the protocol floor.
#[cfg(feature = "tls")]
pub async fn serve_tls(
    addr: SocketAddr,
    app: Router,
    cert: &std::path::Path,
    key: &std::path::Path,
) -> Result<(), ServerError> {
    use axum_server::tls_rustls::RustlsConfig;

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(ServerError::Tls)?;

    tracing::info!(%addr, cert = %cert.display(), "HTTPS listener started");

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| ServerError::Serve {
            listener: ListenerKind::Https,
            message: e.to_string(),
        })
}
