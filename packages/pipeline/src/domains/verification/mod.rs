//! Verification domain - one-time passwords bound to a phone number
//!
//! Responsibilities:
//! - Issue 6-digit codes with an absolute expiry
//! - Hand codes to a delivery channel (console banner or SMS)
//! - Single-use validation with lazy expiry cleanup

pub mod delivery;
pub mod otp;

pub use delivery::{ConsoleDelivery, OtpDelivery, RecordingDelivery, SmsDelivery};
pub use otp::{IssuedOtp, OtpManager, OtpRecord, OtpStatus, DEFAULT_OTP_TTL_SECS};
