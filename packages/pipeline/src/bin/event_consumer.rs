//! Stream processor
//!
//! Reads loan desk events from the durable log through a named consumer
//! group, logs each one, and acknowledges it. Runs until Ctrl-C.

use anyhow::Result;
use pipeline_core::common::telemetry::init_tracing;
use pipeline_core::kernel::EventConsumer;
use pipeline_core::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,pipeline_core=debug");

    let config = Config::from_env()?;
    let consumer_config = config.consumer_config();

    tracing::info!(
        broker = %consumer_config.broker,
        group = %consumer_config.group,
        "Starting event consumer"
    );

    let messages = EventConsumer::open_stream(&consumer_config).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                signal_token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    let stats = EventConsumer::default().run(messages, shutdown).await;

    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        receive_errors = stats.receive_errors,
        "Event consumer exited"
    );
    Ok(())
}
