// ABOUTME: Server bootstrap and lifecycle
// ABOUTME: Binds the listener, runs background maintenance tasks, and shuts down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parley_core::constants::TOKEN_PURGE_INTERVAL;
use parley_security::TokenIssuer;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::create_router;
use crate::config::Config;
use crate::mailer::LogMailer;
use crate::state::AppState;

/// Periodically delete token rows whose expiry has passed.
pub fn spawn_token_purger(issuer: TokenIssuer, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = issuer.purge_expired().await {
                error!(error = %e, "Failed to purge expired tokens");
            }
        }
    })
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let pool = parley_storage::connect(&config.database_url).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let environment = config.environment;
    let state = AppState::new(config, pool.clone(), Arc::new(LogMailer));

    let sweeper = state.limiter.spawn_sweeper();
    let purger = spawn_token_purger(state.issuer.clone(), TOKEN_PURGE_INTERVAL);

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        addr = %addr,
        environment = environment.as_str(),
        "Server listening"
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    purger.abort();
    pool.close().await;

    served?;
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
