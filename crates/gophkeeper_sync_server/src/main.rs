//! `gophkeeper-server` binary.

use std::sync::Arc;

use gophkeeper_sync_server::{http, ServerConfig, SyncServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("gophkeeper_sync_server={level}").parse()?)
                .add_directive(format!("tower_http={level}").parse()?),
        )
        .init();

    tracing::info!(?config, "starting gophkeeper-server");

    let bind_addr = config.bind_addr;
    let server = Arc::new(SyncServer::open(config)?);
    let router = http::router(server);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
