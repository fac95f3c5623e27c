//! Listener setup shared by the HTTP binaries.

use axum::Router;
use std::net::Ipv4Addr;
use tokio::net::TcpListener;

/// Bind `0.0.0.0` on the configured port, falling back to the service default.
pub async fn bind_listener(
    configured: Option<u16>,
    default_port: u16,
) -> Result<(TcpListener, u16), std::io::Error> {
    let port = configured.unwrap_or(default_port);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    let port = listener.local_addr()?.port();
    tracing::debug!(port, "Bound server port");
    Ok((listener, port))
}

/// Serve `app` until the process is stopped.
pub async fn serve(
    app: Router,
    configured: Option<u16>,
    default_port: u16,
) -> Result<(), std::io::Error> {
    let (listener, port) = bind_listener(configured, default_port).await?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await
}
