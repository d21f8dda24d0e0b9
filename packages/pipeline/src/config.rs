use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use twilio::TwilioOptions;

use crate::domains::verification::DEFAULT_OTP_TTL_SECS;
use crate::kernel::{ConsumerConfig, PublisherConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub event_broker: String,
    pub event_topic: String,
    pub event_stream: String,
    pub consumer_group: String,
    pub publisher_retry: Duration,
    pub otp_ttl: chrono::Duration,
    pub customers_file: PathBuf,
    /// Present only when all three Twilio variables are set
    pub twilio: Option<TwilioOptions>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let publisher_retry_secs: u64 = or_default("PUBLISHER_RETRY_SECS", "5")
            .parse()
            .context("PUBLISHER_RETRY_SECS must be a whole number of seconds")?;
        let otp_ttl_secs: i64 = or_default("OTP_TTL_SECS", &DEFAULT_OTP_TTL_SECS.to_string())
            .parse()
            .context("OTP_TTL_SECS must be a whole number of seconds")?;
        if otp_ttl_secs <= 0 {
            anyhow::bail!("OTP_TTL_SECS must be positive");
        }

        let twilio = match (
            lookup("TWILIO_ACCOUNT_SID"),
            lookup("TWILIO_AUTH_TOKEN"),
            lookup("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioOptions {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        Ok(Self {
            event_broker: or_default("EVENT_BROKER", "localhost:9092"),
            event_topic: or_default("EVENT_TOPIC", "capital_connect_events"),
            event_stream: or_default("EVENT_STREAM", "CAPITAL_CONNECT"),
            consumer_group: or_default("CONSUMER_GROUP", "event_processor_group"),
            publisher_retry: Duration::from_secs(publisher_retry_secs),
            otp_ttl: chrono::Duration::seconds(otp_ttl_secs),
            customers_file: PathBuf::from(or_default("CUSTOMERS_FILE", "data/customers.json")),
            twilio,
        })
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            topic: self.event_topic.clone(),
            retry_interval: self.publisher_retry,
        }
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            broker: self.event_broker.clone(),
            stream: self.event_stream.clone(),
            subject: self.event_topic.clone(),
            group: self.consumer_group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.event_broker, "localhost:9092");
        assert_eq!(config.event_topic, "capital_connect_events");
        assert_eq!(config.event_stream, "CAPITAL_CONNECT");
        assert_eq!(config.consumer_group, "event_processor_group");
        assert_eq!(config.publisher_retry, Duration::from_secs(5));
        assert_eq!(config.otp_ttl, chrono::Duration::seconds(300));
        assert_eq!(config.customers_file, PathBuf::from("data/customers.json"));
        assert!(config.twilio.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("EVENT_BROKER", "nats.internal:4222"),
            ("EVENT_TOPIC", "loans"),
            ("PUBLISHER_RETRY_SECS", "1"),
            ("OTP_TTL_SECS", "60"),
        ])
        .unwrap();

        assert_eq!(config.event_broker, "nats.internal:4222");
        assert_eq!(config.publisher_config().topic, "loans");
        assert_eq!(config.publisher_config().retry_interval, Duration::from_secs(1));
        assert_eq!(config.consumer_config().subject, "loans");
        assert_eq!(config.otp_ttl, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        assert!(config_from(&[("PUBLISHER_RETRY_SECS", "soon")]).is_err());
        assert!(config_from(&[("OTP_TTL_SECS", "-5")]).is_err());
        assert!(config_from(&[("OTP_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_twilio_requires_all_three_variables() {
        let partial = config_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
        ])
        .unwrap();
        assert!(partial.twilio.is_none());

        let full = config_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_FROM_NUMBER", "+15005550006"),
        ])
        .unwrap();
        assert_eq!(full.twilio.map(|t| t.from_number).as_deref(), Some("+15005550006"));
    }
}
