//! One-time password store.
//!
//! Per phone number the lifecycle is `NONE -> ISSUED -> (CONSUMED | EXPIRED)`.
//! Issuing again while a code is live overwrites it, which invalidates the
//! earlier code.
//!
//! Records live in a sharded map. `generate` overwrites and `validate`
//! check-then-delete both run while holding the shard's write lock for that
//! phone number, so two correct validations racing each other cannot both
//! succeed, while unrelated phone numbers rarely touch the same shard.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::delivery::OtpDelivery;
use crate::common::{Clock, SystemClock};

/// Default code lifetime.
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;

const CODE_SPACE: u32 = 1_000_000;

/// Largest multiple of `CODE_SPACE` representable in a `u32`; draws at or
/// above it are rejected so every code is equally likely.
const UNBIASED_CEILING: u32 = (u32::MAX / CODE_SPACE) * CODE_SPACE;

/// A live code for one phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Result of issuing a code.
///
/// The code itself is never serialized, so an `IssuedOtp` can be recorded in
/// an event without leaking the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedOtp {
    #[serde(skip_serializing)]
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Observed state for a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStatus {
    NotIssued,
    Issued,
    /// Past expiry but not yet cleaned up by a validation attempt
    Expired,
}

pub struct OtpManager {
    records: DashMap<String, OtpRecord>,
    clock: Arc<dyn Clock>,
    delivery: Arc<dyn OtpDelivery>,
    ttl: Duration,
}

impl OtpManager {
    pub fn new(delivery: Arc<dyn OtpDelivery>) -> Self {
        Self {
            records: DashMap::new(),
            clock: Arc::new(SystemClock),
            delivery,
            ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Lifetime used by [`OtpManager::generate`].
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a code with the default lifetime.
    pub async fn generate(&self, phone_number: &str) -> IssuedOtp {
        self.generate_with_ttl(phone_number, self.ttl).await
    }

    /// Issue a code valid until `now + ttl`, replacing any live code.
    ///
    /// Delivery failures are logged; the code is stored either way.
    pub async fn generate_with_ttl(&self, phone_number: &str, ttl: Duration) -> IssuedOtp {
        let code = random_code();
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let replaced = self
            .records
            .insert(
                phone_number.to_string(),
                OtpRecord {
                    code: code.clone(),
                    expires_at,
                },
            )
            .is_some();

        debug!(phone = %phone_number, replaced, %expires_at, "OTP issued");

        if let Err(e) = self.delivery.deliver(phone_number, &code).await {
            error!(phone = %phone_number, error = %e, "OTP delivery failed");
        }

        IssuedOtp { code, expires_at }
    }

    /// Check `candidate` against the live code for `phone_number`.
    ///
    /// A match before expiry consumes the code. An expired record is removed.
    /// A mismatch leaves the record untouched so the customer can retry until
    /// expiry; there is no attempt limit.
    pub fn validate(&self, phone_number: &str, candidate: &str) -> bool {
        let now = self.clock.now();

        match self.records.entry(phone_number.to_string()) {
            Entry::Vacant(_) => {
                debug!(phone = %phone_number, "no OTP issued");
                false
            }
            Entry::Occupied(entry) => {
                if entry.get().is_expired_at(now) {
                    entry.remove();
                    info!(phone = %phone_number, "OTP expired");
                    false
                } else if entry.get().code == candidate {
                    entry.remove();
                    info!(phone = %phone_number, "OTP verified");
                    true
                } else {
                    warn!(phone = %phone_number, "OTP mismatch");
                    false
                }
            }
        }
    }

    pub fn status(&self, phone_number: &str) -> OtpStatus {
        let now = self.clock.now();
        match self.records.get(phone_number) {
            None => OtpStatus::NotIssued,
            Some(record) if record.is_expired_at(now) => OtpStatus::Expired,
            Some(_) => OtpStatus::Issued,
        }
    }

    /// Number of stored records, including expired ones not yet cleaned up.
    pub fn live_records(&self) -> usize {
        self.records.len()
    }
}

fn random_code() -> String {
    loop {
        let draw: u32 = rand::random();
        if draw < UNBIASED_CEILING {
            return format!("{:06}", draw % CODE_SPACE);
        }
    }
}
