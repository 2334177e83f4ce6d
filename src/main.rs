use std::sync::Arc;

use joke_mcp_server::{auth::JwksVerifier, build_app, config::Config, logging, AppState};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    if config.oauth.is_none() {
        warn!(
            missing = ?config.missing_oauth_vars,
            "identity provider is not configured; tools/call will fail with a server configuration error"
        );
    }

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(config.oauth.clone(), Arc::new(JwksVerifier::new()?));
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
