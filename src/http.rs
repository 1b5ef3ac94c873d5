use std::net::SocketAddr;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

/// Keep-alive endpoints for hosts that ping the process over HTTP.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .fallback(|| async { "bot up" })
}

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("HTTP keep-alive listening on {}", addr);

    axum::serve(listener, router()).await?;

    Ok(())
}
