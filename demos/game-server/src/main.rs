//! Runs a pairhub server configured from the environment.
//!
//! ```text
//! PAIRHUB_BIND=0.0.0.0:8080 RUST_LOG=pairhub=debug cargo run -p game-server
//! ```

use pairhub::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), PairhubError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        grace_secs = config.room.reconnect_grace.as_secs(),
        "starting game server"
    );

    let server = PairhubServer::builder()
        .config(config)
        .build(AnonymousAuthenticator)
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown signal received");
        })
        .await
}
