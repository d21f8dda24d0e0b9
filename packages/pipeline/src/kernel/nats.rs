//! Durable event log abstraction for production and testing.
//!
//! Production uses NATS with a JetStream stream bound to the event subject, so
//! published events are retained until the stream processor reads them. Tests
//! swap in [`TestEventLog`], which records what would have been published.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};
use async_nats::jetstream;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::events::Event;

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Append-only log that events are sent to.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Send a message to a subject.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;

    /// Block until everything sent so far has reached the broker.
    async fn flush(&self) -> Result<()>;
}

/// Establishes a connection to an [`EventLog`].
///
/// Each call is one attempt; retry policy belongs to the caller.
#[async_trait]
pub trait LogConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn EventLog>>;
}

/// NATS client backed event log.
///
/// Publishes go through JetStream and wait for the stream's ack, so a
/// successful publish means the event is stored, not just sent.
pub struct NatsEventLog {
    client: async_nats::Client,
    context: jetstream::Context,
}

impl NatsEventLog {
    pub fn new(client: async_nats::Client) -> Self {
        let context = jetstream::new(client.clone());
        Self { client, context }
    }
}

#[async_trait]
impl EventLog for NatsEventLog {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        let ack = self
            .context
            .publish(subject, payload)
            .await
            .map_err(|e| anyhow!("JetStream publish failed: {}", e))?
            .await
            .map_err(|e| anyhow!("JetStream did not store event: {}", e))?;
        debug!(stream = %ack.stream, sequence = ack.sequence, "event stored");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.client.flush().await?;
        Ok(())
    }
}

/// Connects to a NATS broker and makes sure the JetStream stream exists.
#[derive(Debug, Clone)]
pub struct NatsConnector {
    broker: String,
    stream: String,
    subject: String,
}

impl NatsConnector {
    pub fn new(
        broker: impl Into<String>,
        stream: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            broker: broker.into(),
            stream: stream.into(),
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl LogConnector for NatsConnector {
    async fn connect(&self) -> Result<Arc<dyn EventLog>> {
        let client = async_nats::connect(self.broker.as_str())
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", self.broker))?;

        ensure_stream(&client, &self.stream, &self.subject).await?;

        let log: Arc<dyn EventLog> = Arc::new(NatsEventLog::new(client));
        Ok(log)
    }
}

/// Declare the JetStream stream capturing `subject`, or fetch it if it
/// already exists.
pub async fn ensure_stream(
    client: &async_nats::Client,
    stream: &str,
    subject: &str,
) -> Result<jetstream::stream::Stream> {
    let context = jetstream::new(client.clone());
    let stream_handle = context
        .get_or_create_stream(jetstream::stream::Config {
            name: stream.to_string(),
            subjects: vec![subject.to_string()],
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow!("Failed to declare stream {}: {}", stream, e))?;

    info!(stream = %stream, subject = %subject, "JetStream stream ready");
    Ok(stream_handle)
}

/// Event log double that tracks published messages for testing.
///
/// Publishing and flushing can each be switched to fail.
#[derive(Default)]
pub struct TestEventLog {
    published: RwLock<Vec<PublishedMessage>>,
    flushes: AtomicUsize,
    fail_publish: AtomicBool,
    fail_flush: AtomicBool,
}

impl TestEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_publishes(&self, failing: bool) {
        self.fail_publish.store(failing, Ordering::SeqCst);
    }

    pub fn fail_flushes(&self, failing: bool) {
        self.fail_flush.store(failing, Ordering::SeqCst);
    }

    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Decode every published payload as an [`Event`], skipping anything that
    /// does not parse.
    pub fn events(&self) -> Vec<Event> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter_map(|m| Event::from_slice(&m.payload).ok())
            .collect()
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.flushes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventLog for TestEventLog {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(anyhow!("broker rejected publish to {}", subject));
        }
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { subject, payload });
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(anyhow!("flush timed out"));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
