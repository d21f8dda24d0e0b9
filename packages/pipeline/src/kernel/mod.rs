//! Kernel module - event plumbing shared by the desk and the consumer.

pub mod consumer;
pub mod events;
pub mod nats;
pub mod publisher;
pub mod test_dependencies;
pub mod traced;

pub use consumer::{
    process_message, ConsumerConfig, ConsumerStats, EventConsumer, InboundMessage, LogSink,
    ProcessedRecord, RecordSink,
};
pub use events::{Event, EventType};
pub use nats::{
    ensure_stream, EventLog, LogConnector, NatsConnector, NatsEventLog, PublishedMessage,
    TestEventLog,
};
pub use publisher::{ConnectionState, EventPublisher, PublishOutcome, PublisherConfig};
pub use test_dependencies::{CollectingSink, TestConnector};
pub use traced::{traced, Traced};
