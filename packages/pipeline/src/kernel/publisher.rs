//! Best-effort event publisher.
//!
//! The publisher decouples decision calls from the availability of the event
//! log:
//!
//! - `start()` spawns one background task that connects, retrying at a fixed
//!   interval until it succeeds or the publisher is shut down.
//! - `publish()` never waits for connectivity. Before the log is connected the
//!   event is dropped; afterwards it is sent and flushed.
//! - Every failure is logged and reported through [`PublishOutcome`]; nothing
//!   is returned as an error, so publishing can never fail the business call
//!   that produced the event.
//!
//! # Architecture
//!
//! ```text
//! EventPublisher (clone = shared handle)
//!     │
//!     ├─► start() ──► connection task ──► LogConnector::connect (retry every N s)
//!     │                    └─► OnceCell<Arc<dyn EventLog>> + watch<ConnectionState>
//!     │
//!     └─► publish() ──► OnceCell::get ──► EventLog::publish + flush
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::{Event, EventType};
use super::nats::{EventLog, LogConnector};

/// Subject events are published to unless configured otherwise.
pub const DEFAULT_TOPIC: &str = "capital_connect_events";

/// Fixed delay between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Connection lifecycle of the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What happened to a single publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishOutcome {
    /// Sent and flushed
    Sent,
    /// Log not connected; event discarded
    Dropped,
    /// Serialization, send or flush failed
    Failed,
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub topic: String,
    pub retry_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Shared handle to the publisher. Cloning is cheap; all clones see the same
/// connection.
#[derive(Clone)]
pub struct EventPublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    connector: Arc<dyn LogConnector>,
    config: PublisherConfig,
    log: OnceCell<Arc<dyn EventLog>>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventPublisher {
    /// Create a disconnected publisher. Nothing happens until [`start`].
    ///
    /// [`start`]: EventPublisher::start
    pub fn new(connector: Arc<dyn LogConnector>, config: PublisherConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(PublisherInner {
                connector,
                config,
                log: OnceCell::new(),
                state,
                shutdown: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.inner.config
    }

    pub fn topic(&self) -> &str {
        &self.inner.config.topic
    }

    /// Spawn the connection task. Must be called from within a Tokio runtime.
    ///
    /// Returns `false` without doing anything if the task was already started
    /// or the publisher has been shut down, so at most one connection attempt
    /// is ever in flight.
    pub fn start(&self) -> bool {
        let mut task = self.inner.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() || self.inner.shutdown.is_cancelled() {
            return false;
        }

        self.inner.state.send_replace(ConnectionState::Connecting);
        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(inner.connect_loop()));
        true
    }

    /// Stop the connection task, flush anything buffered and mark the
    /// publisher disconnected. Later publishes are dropped.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "event publisher connection task ended abnormally");
            }
        }

        if let Some(log) = self.inner.log.get() {
            if let Err(e) = log.flush().await {
                warn!(error = %e, "final flush of event log failed");
            }
        }

        self.inner.state.send_replace(ConnectionState::Disconnected);
        info!("event publisher shut down");
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Wait until the publisher reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed
        // channel.
        let _ = rx.wait_for(|state| *state == target).await;
    }

    /// Publish an event of `event_type` carrying `payload` to `topic`.
    pub async fn publish(
        &self,
        topic: &str,
        event_type: EventType,
        payload: serde_json::Value,
    ) -> PublishOutcome {
        let Some(log) = self.ready_log() else {
            warn!(event_type = %event_type, "Event log not ready. Dropped event");
            return PublishOutcome::Dropped;
        };

        let event = Event::new(event_type, payload);
        send(log.as_ref(), topic, &event).await
    }

    /// Publish `{args, result}` for a completed operation to the configured
    /// topic.
    pub async fn record<A, R>(&self, event_type: EventType, args: &A, result: &R) -> PublishOutcome
    where
        A: Serialize + ?Sized,
        R: Serialize + ?Sized,
    {
        let payload = match operation_payload(args, result) {
            Ok(payload) => payload,
            Err(e) => {
                error!(event_type = %event_type, error = %e, "Failed to serialize event payload");
                return PublishOutcome::Failed;
            }
        };

        self.publish(self.topic(), event_type, payload).await
    }

    fn ready_log(&self) -> Option<&Arc<dyn EventLog>> {
        if self.inner.shutdown.is_cancelled() {
            return None;
        }
        self.inner.log.get()
    }
}

impl PublisherInner {
    async fn connect_loop(self: Arc<Self>) {
        let retry_interval = self.config.retry_interval;
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            debug!(attempt, "connecting to event log");

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!(attempt, "event log connection cancelled");
                    return;
                }
                result = self.connector.connect() => match result {
                    Ok(log) => {
                        if self.log.set(log).is_err() {
                            warn!("event log was already connected");
                        }
                        self.state.send_replace(ConnectionState::Connected);
                        info!(attempt, "Connected to event log");
                        return;
                    }
                    Err(e) => {
                        warn!(
                            attempt,
                            error = %e,
                            retry_in_secs = retry_interval.as_secs_f64(),
                            "Failed to connect to event log, retrying"
                        );
                    }
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(attempt, "event log connection cancelled");
                    return;
                }
                _ = tokio::time::sleep(retry_interval) => {}
            }
        }
    }
}

async fn send(log: &dyn EventLog, topic: &str, event: &Event) -> PublishOutcome {
    let bytes = match event.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(event_type = %event.event_type, error = %e, "Failed to serialize event");
            return PublishOutcome::Failed;
        }
    };

    if let Err(e) = log.publish(topic.to_string(), bytes).await {
        error!(event_type = %event.event_type, topic = %topic, error = %e, "Error sending event");
        return PublishOutcome::Failed;
    }

    if let Err(e) = log.flush().await {
        error!(event_type = %event.event_type, topic = %topic, error = %e, "Error flushing event");
        return PublishOutcome::Failed;
    }

    info!(
        event_type = %event.event_type,
        event_id = %event.event_id,
        topic = %topic,
        "Sent event"
    );
    PublishOutcome::Sent
}

fn operation_payload<A, R>(args: &A, result: &R) -> serde_json::Result<serde_json::Value>
where
    A: Serialize + ?Sized,
    R: Serialize + ?Sized,
{
    Ok(json!({
        "args": serde_json::to_value(args)?,
        "result": serde_json::to_value(result)?,
    }))
}
