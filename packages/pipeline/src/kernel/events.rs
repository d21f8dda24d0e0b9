//! Event envelope written to the durable log.
//!
//! Wire format (JSON):
//!
//! ```text
//! {"event_id": "...", "event_type": "UNDERWRITING", "payload": {...}, "timestamp": 1718000000.123}
//! ```
//!
//! `payload` is `{"args": ..., "result": ...}` for events produced by traced
//! operations. `timestamp` is the publish time in seconds since the epoch.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    KycCheck,
    OtpSend,
    OtpVerify,
    OfferCheck,
    CreditCheck,
    Negotiation,
    Underwriting,
    SanctionGenerated,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::KycCheck,
        EventType::OtpSend,
        EventType::OtpVerify,
        EventType::OfferCheck,
        EventType::CreditCheck,
        EventType::Negotiation,
        EventType::Underwriting,
        EventType::SanctionGenerated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::KycCheck => "KYC_CHECK",
            EventType::OtpSend => "OTP_SEND",
            EventType::OtpVerify => "OTP_VERIFY",
            EventType::OfferCheck => "OFFER_CHECK",
            EventType::CreditCheck => "CREDIT_CHECK",
            EventType::Negotiation => "NEGOTIATION",
            EventType::Underwriting => "UNDERWRITING",
            EventType::SanctionGenerated => "SANCTION_GENERATED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Lets at-least-once consumers drop redeliveries. Nil when the producer
    /// did not assign one.
    #[serde(default)]
    pub event_id: Uuid,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub timestamp: f64,
}

impl Event {
    /// Stamp a new event with the current time.
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self::at(event_type, payload, Utc::now())
    }

    pub fn at(event_type: EventType, payload: serde_json::Value, at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type,
            payload,
            timestamp: at.timestamp_micros() as f64 / 1_000_000.0,
        }
    }

    /// Publish time, if the timestamp is representable.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_micros((self.timestamp * 1_000_000.0).round() as i64)
            .single()
    }

    pub fn to_bytes(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_wire_names_match_as_str() {
        for event_type in EventType::ALL {
            let value = serde_json::to_value(event_type).unwrap();
            assert_eq!(value, event_type.as_str());
        }
    }

    #[test]
    fn test_envelope_fields() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let event = Event::at(EventType::Underwriting, json!({"args": {}, "result": {}}), at);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "UNDERWRITING");
        assert_eq!(value["timestamp"], at.timestamp() as f64);
        assert!(value["payload"]["args"].is_object());
        assert_eq!(event.published_at(), Some(at));
    }

    #[test]
    fn test_envelope_without_event_id_is_accepted() {
        let event = Event::from_slice(
            br#"{"event_type": "OTP_SEND", "payload": {"phone": "9876543210"}, "timestamp": 1717243200.5}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, EventType::OtpSend);
        assert!(event.event_id.is_nil());
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let result = Event::from_slice(
            br#"{"event_type": "LOGIN", "payload": {}, "timestamp": 1.0}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_each_event_gets_distinct_id() {
        let a = Event::new(EventType::Negotiation, json!({}));
        let b = Event::new(EventType::Negotiation, json!({}));
        assert_ne!(a.event_id, b.event_id);
    }
}
