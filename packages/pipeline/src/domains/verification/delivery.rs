//! OTP delivery channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;
use twilio::TwilioService;

/// Channel that gets a freshly issued code to the customer.
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, phone_number: &str, code: &str) -> Result<()>;
}

/// Writes the code to the operator log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDelivery;

#[async_trait]
impl OtpDelivery for ConsoleDelivery {
    async fn deliver(&self, phone_number: &str, code: &str) -> Result<()> {
        info!(
            phone = %phone_number,
            "\n========================================\n[SMS] To {}: Your OTP is {}\n========================================",
            phone_number,
            code
        );
        Ok(())
    }
}

/// Sends the code as a text message through Twilio.
pub struct SmsDelivery {
    twilio: Arc<TwilioService>,
}

impl SmsDelivery {
    pub fn new(twilio: Arc<TwilioService>) -> Self {
        Self { twilio }
    }
}

#[async_trait]
impl OtpDelivery for SmsDelivery {
    async fn deliver(&self, phone_number: &str, code: &str) -> Result<()> {
        let body = format!(
            "Your Capital Connect verification code is {}. Do not share it with anyone.",
            code
        );
        let message = self
            .twilio
            .send_sms(phone_number, &body)
            .await
            .map_err(|e| anyhow!("Failed to send OTP SMS: {}", e))?;

        info!(phone = %phone_number, sid = %message.sid, "OTP SMS queued");
        Ok(())
    }
}

/// A delivered code captured by [`RecordingDelivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredCode {
    pub phone_number: String,
    pub code: String,
}

/// Delivery double that records every code and can be told to fail.
#[derive(Default)]
pub struct RecordingDelivery {
    delivered: Mutex<Vec<DeliveredCode>>,
    failing: AtomicBool,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (the code is still recorded).
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<DeliveredCode> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Most recent code sent to `phone_number`.
    pub fn last_code_for(&self, phone_number: &str) -> Option<String> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|d| d.phone_number == phone_number)
            .map(|d| d.code.clone())
    }
}

#[async_trait]
impl OtpDelivery for RecordingDelivery {
    async fn deliver(&self, phone_number: &str, code: &str) -> Result<()> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DeliveredCode {
                phone_number: phone_number.to_string(),
                code: code.to_string(),
            });

        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("SMS gateway unavailable"));
        }
        Ok(())
    }
}
