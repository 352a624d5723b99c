//! Flagtrail server entry point.

mod config;

use flagtrail_db::{DbError, DbManager};
use flagtrail_events::{EventService, QueuedNotifierFactory, WebhookTestDispatcher};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};

#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flagtrail=info")),
        )
        .json()
        .init();

    info!("Starting Flagtrail server...");

    let config = ServerConfig::from_env()?;

    let manager = DbManager::connect(&config.db).await?;

    let (notifiers, mut queue) = QueuedNotifierFactory::channel();
    let drain = tokio::spawn(async move {
        while let Some(event_id) = queue.recv().await {
            info!(%event_id, "Handing off event notification");
        }
    });

    let service = EventService::new(manager.events(), config.events.clone());
    let dispatcher = WebhookTestDispatcher::new(
        manager.events(),
        manager.webhooks(),
        notifiers,
        config.events.clone(),
    );

    info!(
        api_version = %service.config().api_version,
        max_per_page = service.config().max_per_page,
        "Event services ready"
    );

    tokio::signal::ctrl_c().await?;

    // Closing the last sender ends the drain loop.
    drop(dispatcher);
    drain.await.ok();

    info!("Flagtrail server stopped.");
    Ok(())
}
