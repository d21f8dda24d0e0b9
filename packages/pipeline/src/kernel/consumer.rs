//! Stream processor reading events back off the durable log.
//!
//! # Architecture
//!
//! ```text
//! JetStream durable pull consumer (named after the group)
//!     │
//!     └─► EventConsumer::run
//!             ├─► process_message(bytes) ──► ProcessedRecord
//!             ├─► RecordSink::emit(record)
//!             └─► ack (every message, including undecodable ones)
//! ```
//!
//! Messages are acknowledged only after the record has been emitted, so a
//! crash mid-message leads to redelivery rather than loss.

use std::fmt::Display;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_nats::jetstream;
use async_nats::jetstream::consumer::{pull, AckPolicy, DeliverPolicy};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::Event;
use super::nats::ensure_stream;

// =============================================================================
// Records
// =============================================================================

/// Outcome of processing one message.
///
/// `original` is the envelope exactly as received, so unknown event types and
/// extra fields survive into the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcessedRecord {
    Processed {
        status: String,
        original: serde_json::Value,
    },
    Error {
        error: String,
    },
}

impl ProcessedRecord {
    pub fn is_processed(&self) -> bool {
        matches!(self, ProcessedRecord::Processed { .. })
    }
}

/// Decode one message body and turn it into a record.
///
/// Any JSON object with `event_type` and `payload` is accepted.
pub fn process_message(bytes: &[u8]) -> ProcessedRecord {
    match decode_envelope(bytes) {
        Ok(original) => {
            let event_type = original["event_type"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| original["event_type"].to_string());
            let published_at = serde_json::from_value::<Event>(original.clone())
                .ok()
                .and_then(|event| event.published_at());

            info!(
                event_type = %event_type,
                published_at = ?published_at,
                payload = %original["payload"],
                "PROCESSING: {}",
                event_type
            );
            ProcessedRecord::Processed {
                status: "processed".to_string(),
                original,
            }
        }
        Err(error) => {
            warn!(error = %error, "Could not decode event");
            ProcessedRecord::Error { error }
        }
    }
}

fn decode_envelope(bytes: &[u8]) -> std::result::Result<serde_json::Value, String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

    let Some(envelope) = value.as_object() else {
        return Err("event must be a JSON object".to_string());
    };
    for field in ["event_type", "payload"] {
        if !envelope.contains_key(field) {
            return Err(format!("missing field `{}`", field));
        }
    }
    Ok(value)
}

// =============================================================================
// Seams
// =============================================================================

/// A message delivered by the log that must be acknowledged.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    fn payload(&self) -> &[u8];

    async fn acknowledge(&self) -> Result<()>;
}

#[async_trait]
impl InboundMessage for jetstream::Message {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    async fn acknowledge(&self) -> Result<()> {
        self.ack().await.map_err(|e| anyhow!("ack failed: {}", e))
    }
}

/// Where processed records go.
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &ProcessedRecord);
}

/// Writes each record as a JSON log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn emit(&self, record: &ProcessedRecord) {
        match serde_json::to_string(record) {
            Ok(json) => info!(record = %json, "event record"),
            Err(e) => error!(error = %e, "Failed to serialize event record"),
        }
    }
}

// =============================================================================
// Consumer
// =============================================================================

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub broker: String,
    pub stream: String,
    pub subject: String,
    /// Durable consumer name; restarts resume where this group left off
    pub group: String,
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub processed: u64,
    pub failed: u64,
    pub receive_errors: u64,
}

pub struct EventConsumer {
    sink: Arc<dyn RecordSink>,
}

impl Default for EventConsumer {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl EventConsumer {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }

    /// Connect to the broker and open the durable pull consumer for `config`.
    ///
    /// Deliver policy "all" replays from the earliest retained event the
    /// first time the group is seen; afterwards the server remembers the
    /// group's position.
    pub async fn open_stream(config: &ConsumerConfig) -> Result<pull::Stream> {
        let client = async_nats::connect(config.broker.as_str())
            .await
            .map_err(|e| anyhow!("Failed to connect to NATS at {}: {}", config.broker, e))?;

        let stream = ensure_stream(&client, &config.stream, &config.subject).await?;
        let consumer = stream
            .get_or_create_consumer(
                &config.group,
                pull::Config {
                    durable_name: Some(config.group.clone()),
                    deliver_policy: DeliverPolicy::All,
                    ack_policy: AckPolicy::Explicit,
                    filter_subject: config.subject.clone(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer {}: {}", config.group, e))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| anyhow!("Failed to open message stream: {}", e))?;

        info!(
            stream = %config.stream,
            subject = %config.subject,
            group = %config.group,
            "Listening for events"
        );
        Ok(messages)
    }

    /// Process messages until the stream ends or `shutdown` is cancelled.
    pub async fn run<S, M, E>(&self, messages: S, shutdown: CancellationToken) -> ConsumerStats
    where
        S: Stream<Item = std::result::Result<M, E>>,
        M: InboundMessage,
        E: Display,
    {
        let mut stats = ConsumerStats::default();
        let mut messages = std::pin::pin!(messages);

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("event consumer cancelled");
                    break;
                }
                next = messages.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    stats.receive_errors += 1;
                    error!(error = %e, "Failed to receive message");
                    continue;
                }
                None => {
                    info!("message stream ended");
                    break;
                }
            };

            let record = process_message(message.payload());
            self.sink.emit(&record);
            if record.is_processed() {
                stats.processed += 1;
            } else {
                stats.failed += 1;
            }

            if let Err(e) = message.acknowledge().await {
                warn!(error = %e, "Failed to acknowledge message");
            } else {
                debug!("message acknowledged");
            }
        }

        info!(
            processed = stats.processed,
            failed = stats.failed,
            receive_errors = stats.receive_errors,
            "event consumer stopped"
        );
        stats
    }
}
