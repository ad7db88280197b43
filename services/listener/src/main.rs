//! courier listener
//!
//! Binds an exclusive queue to the `logs_topic` exchange for the severity
//! routing keys and forwards every event to the log service.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_messaging::{ConnectionManager, Consumer, HttpLogSink};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(topics = ?config.topics, "Starting courier listener");

    let broker = ConnectionManager::default()
        .connect(&config.rabbitmq_url)
        .await
        .context("failed to connect to RabbitMQ")?;

    let sink = Arc::new(HttpLogSink::new(config.log_service_url.clone()));
    let outcome = match Consumer::new(broker.clone(), sink, config.consumer.clone()).await {
        Ok(consumer) => {
            info!("Listening for and consuming RabbitMQ messages");
            tokio::select! {
                result = consumer.listen(&config.topics) => {
                    result.context("event consumer stopped")
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    Ok(())
                }
            }
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to set up event consumer")),
    };

    if let Err(e) = broker.close().await {
        warn!(error = %e, "Failed to close broker connection");
    }

    info!("Listener shutdown complete");
    outcome
}
