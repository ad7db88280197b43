//! courier broker
//!
//! Single entry point in front of the backend services. This process:
//! - Connects to RabbitMQ once, retrying with quadratic backoff
//! - Consumes `log`, `auth` and `event` topics and forwards them to the log service
//! - Serves `POST /` and dispatches each request to one downstream transport

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use courier_broker::{
    api,
    config::Config,
    dispatch::{Adapters, Dispatcher},
    state::AppState,
};
use courier_messaging::{ConnectionManager, Consumer, HttpLogSink};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to COURIER_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting courier broker");
    info!(
        listen_addr = %config.listen_addr,
        topics = ?config.topics,
        "Configuration loaded"
    );

    let broker = ConnectionManager::default()
        .connect(&config.rabbitmq_url)
        .await
        .context("failed to connect to RabbitMQ")?;

    let sink = Arc::new(HttpLogSink::new(config.log_service_url.clone()));
    let consumer = Consumer::new(broker.clone(), sink, config.consumer.clone())
        .await
        .context("failed to set up event consumer")?;

    let topics = config.topics.clone();
    let consumer_handle = tokio::spawn(async move { consumer.listen(&topics).await });

    let dispatcher = Dispatcher::new(Adapters::from_config(&config, broker.clone()));
    let app = api::create_router(AppState::new(dispatcher));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                info!("Received shutdown signal");
            })
            .await
    });

    let outcome = tokio::select! {
        result = server_handle => match result {
            Ok(Ok(())) => {
                info!("Server exited normally");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow!(e).context("server error")),
            Err(e) => Err(anyhow!(e).context("server task panicked")),
        },
        // The consume loop only ends when the broker connection is gone.
        result = consumer_handle => match result {
            Ok(Err(e)) => Err(anyhow!(e).context("event consumer stopped")),
            Ok(Ok(())) => Err(anyhow!("event consumer stopped")),
            Err(e) => Err(anyhow!(e).context("event consumer task panicked")),
        },
    };

    if let Err(e) = broker.close().await {
        warn!(error = %e, "Failed to close broker connection");
    }

    info!("Broker shutdown complete");
    outcome
}
