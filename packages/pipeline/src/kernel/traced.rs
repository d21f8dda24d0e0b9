//! Operation wrapper that records every call as an event.
//!
//! ```ignore
//! let negotiate = traced(&publisher, EventType::Negotiation, |args: &NegotiationArgs| {
//!     decision::negotiate(args.requested_amount, args.pre_approved_limit)
//! });
//! let terms = negotiate.call(args).await;
//! ```
//!
//! The wrapped operation runs first and its return value is handed back
//! untouched. Publishing happens afterwards and cannot change that value:
//! [`EventPublisher::record`] absorbs every failure.

use std::future::Future;

use serde::Serialize;

use super::events::EventType;
use super::publisher::EventPublisher;

/// An operation bound to an event type and a publisher.
pub struct Traced<F> {
    publisher: EventPublisher,
    event_type: EventType,
    op: F,
}

/// Wrap `op` so each call publishes `{args, result}` as `event_type`.
pub fn traced<F>(publisher: &EventPublisher, event_type: EventType, op: F) -> Traced<F> {
    Traced {
        publisher: publisher.clone(),
        event_type,
        op,
    }
}

impl<F> Traced<F> {
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Run a synchronous operation.
    pub async fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(&A) -> R,
        A: Serialize,
        R: Serialize,
    {
        let result = (self.op)(&args);
        self.publisher.record(self.event_type, &args, &result).await;
        result
    }

    /// Run an asynchronous operation.
    pub async fn call_async<A, R, Fut>(&self, args: A) -> R
    where
        F: Fn(&A) -> Fut,
        Fut: Future<Output = R>,
        A: Serialize,
        R: Serialize,
    {
        let result = (self.op)(&args).await;
        self.publisher.record(self.event_type, &args, &result).await;
        result
    }
}
