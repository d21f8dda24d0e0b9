//! Loan desk - the operations a loan conversation calls into.
//!
//! Every operation runs through [`traced`], so each call produces exactly one
//! event carrying its arguments and result. OTP codes never appear in those
//! events: the issued code is skipped when serializing and the candidate code
//! is left out of the verification arguments.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use twilio::TwilioService;

use crate::config::Config;
use crate::domains::customers::{
    check_credit, check_offer, verify_customer, CreditCheck, CustomerDirectory,
    CustomerNotFound, JsonCustomerDirectory, KycCheck, OfferCheck,
};
use crate::domains::decision::{
    self, DecisionError, NegotiationTerms, SanctionTerms, UnderwritingVerdict,
};
use crate::domains::verification::{ConsoleDelivery, OtpDelivery, OtpManager, SmsDelivery};
use crate::kernel::{traced, EventPublisher, EventType, NatsConnector};

#[derive(Debug, Serialize)]
struct KycArgs {
    phone_number: String,
    stated_address: String,
}

#[derive(Debug, Serialize)]
struct OtpSendArgs {
    phone_number: String,
}

#[derive(Debug, Serialize)]
struct OtpVerifyArgs {
    phone_number: String,
    #[serde(skip_serializing)]
    code: String,
}

#[derive(Debug, Serialize)]
struct CustomerArgs {
    customer_id: String,
}

#[derive(Debug, Serialize)]
struct NegotiationArgs {
    requested_amount: f64,
    pre_approved_limit: f64,
}

#[derive(Debug, Serialize)]
struct UnderwritingArgs {
    credit_score: u32,
    requested_amount: f64,
    pre_approved_limit: f64,
    monthly_salary: f64,
}

#[derive(Debug, Serialize)]
struct SanctionArgs {
    customer_name: String,
    amount: f64,
    tenure_months: u32,
    interest_rate: f64,
}

#[derive(Clone)]
pub struct LoanDesk {
    otp: Arc<OtpManager>,
    publisher: EventPublisher,
    directory: Arc<dyn CustomerDirectory>,
}

impl LoanDesk {
    pub fn new(
        otp: Arc<OtpManager>,
        publisher: EventPublisher,
        directory: Arc<dyn CustomerDirectory>,
    ) -> Self {
        Self {
            otp,
            publisher,
            directory,
        }
    }

    /// Wire up production dependencies. The publisher is returned unstarted.
    pub fn from_config(config: &Config) -> Result<Self> {
        let directory = JsonCustomerDirectory::from_path(&config.customers_file)
            .with_context(|| {
                format!(
                    "Failed to load customers from {}",
                    config.customers_file.display()
                )
            })?;

        let delivery: Arc<dyn OtpDelivery> = match &config.twilio {
            Some(options) => {
                info!("OTP delivery via Twilio SMS");
                Arc::new(SmsDelivery::new(Arc::new(TwilioService::new(
                    options.clone(),
                ))))
            }
            None => Arc::new(ConsoleDelivery),
        };
        let otp = OtpManager::new(delivery).with_ttl(config.otp_ttl);

        let connector = NatsConnector::new(
            config.event_broker.clone(),
            config.event_stream.clone(),
            config.event_topic.clone(),
        );
        let publisher = EventPublisher::new(Arc::new(connector), config.publisher_config());

        Ok(Self::new(Arc::new(otp), publisher, Arc::new(directory)))
    }

    pub fn otp(&self) -> &OtpManager {
        &self.otp
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn directory(&self) -> &dyn CustomerDirectory {
        self.directory.as_ref()
    }

    /// Match the caller's phone and stated address against the records.
    pub async fn verify_customer(&self, phone_number: &str, stated_address: &str) -> KycCheck {
        traced(&self.publisher, EventType::KycCheck, |args: &KycArgs| {
            verify_customer(self.directory.as_ref(), &args.phone_number, &args.stated_address)
        })
        .call(KycArgs {
            phone_number: phone_number.to_string(),
            stated_address: stated_address.to_string(),
        })
        .await
    }

    /// Issue and deliver a code. The returned code is for the caller only.
    pub async fn generate_otp(&self, phone_number: &str) -> String {
        let op = traced(&self.publisher, EventType::OtpSend, |args: &OtpSendArgs| {
            let otp = Arc::clone(&self.otp);
            let phone_number = args.phone_number.clone();
            async move { otp.generate(&phone_number).await }
        });

        let issued = op
            .call_async(OtpSendArgs {
                phone_number: phone_number.to_string(),
            })
            .await;
        issued.code
    }

    pub async fn validate_otp(&self, phone_number: &str, code: &str) -> bool {
        traced(&self.publisher, EventType::OtpVerify, |args: &OtpVerifyArgs| {
            self.otp.validate(&args.phone_number, &args.code)
        })
        .call(OtpVerifyArgs {
            phone_number: phone_number.to_string(),
            code: code.to_string(),
        })
        .await
    }

    pub async fn check_offer(&self, customer_id: &str) -> Result<OfferCheck, CustomerNotFound> {
        traced(&self.publisher, EventType::OfferCheck, |args: &CustomerArgs| {
            check_offer(self.directory.as_ref(), &args.customer_id)
        })
        .call(CustomerArgs {
            customer_id: customer_id.to_string(),
        })
        .await
    }

    pub async fn check_credit(&self, customer_id: &str) -> Result<CreditCheck, CustomerNotFound> {
        traced(&self.publisher, EventType::CreditCheck, |args: &CustomerArgs| {
            check_credit(self.directory.as_ref(), &args.customer_id)
        })
        .call(CustomerArgs {
            customer_id: customer_id.to_string(),
        })
        .await
    }

    pub async fn negotiate(&self, requested_amount: f64, pre_approved_limit: f64) -> NegotiationTerms {
        traced(&self.publisher, EventType::Negotiation, |args: &NegotiationArgs| {
            decision::negotiate(args.requested_amount, args.pre_approved_limit)
        })
        .call(NegotiationArgs {
            requested_amount,
            pre_approved_limit,
        })
        .await
    }

    /// `monthly_salary` of zero means no salary slip has been provided yet.
    pub async fn underwrite(
        &self,
        credit_score: u32,
        requested_amount: f64,
        pre_approved_limit: f64,
        monthly_salary: f64,
    ) -> UnderwritingVerdict {
        traced(&self.publisher, EventType::Underwriting, |args: &UnderwritingArgs| {
            decision::underwrite(
                args.credit_score,
                args.requested_amount,
                args.pre_approved_limit,
                args.monthly_salary,
            )
        })
        .call(UnderwritingArgs {
            credit_score,
            requested_amount,
            pre_approved_limit,
            monthly_salary,
        })
        .await
    }

    pub async fn sanction(
        &self,
        customer_name: &str,
        amount: f64,
        tenure_months: u32,
        interest_rate: f64,
    ) -> Result<SanctionTerms, DecisionError> {
        traced(&self.publisher, EventType::SanctionGenerated, |args: &SanctionArgs| {
            decision::sanction(
                &args.customer_name,
                args.amount,
                args.tenure_months,
                args.interest_rate,
            )
        })
        .call(SanctionArgs {
            customer_name: customer_name.to_string(),
            amount,
            tenure_months,
            interest_rate,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domains::customers::Customer;
    use crate::domains::decision::Decision;
    use crate::domains::verification::RecordingDelivery;
    use crate::kernel::{ConnectionState, PublisherConfig, TestConnector, TestEventLog};

    struct Harness {
        desk: LoanDesk,
        log: Arc<TestEventLog>,
        delivery: Arc<RecordingDelivery>,
    }

    async fn connected_desk() -> Harness {
        let log = Arc::new(TestEventLog::new());
        let delivery = Arc::new(RecordingDelivery::new());
        let publisher = EventPublisher::new(
            Arc::new(TestConnector::new(log.clone())),
            PublisherConfig::default(),
        );
        publisher.start();
        publisher.wait_for_state(ConnectionState::Connected).await;

        let directory = JsonCustomerDirectory::from_customers(vec![Customer {
            id: "CUST001".to_string(),
            name: "Arjun Sharma".to_string(),
            phone: "9876543210".to_string(),
            address: "Mumbai".to_string(),
            credit_score: 750,
            pre_approved_limit: 500000.0,
        }]);

        let desk = LoanDesk::new(
            Arc::new(OtpManager::new(delivery.clone())),
            publisher,
            Arc::new(directory),
        );
        Harness {
            desk,
            log,
            delivery,
        }
    }

    #[tokio::test]
    async fn test_otp_events_never_contain_codes() {
        let h = connected_desk().await;

        let code = h.desk.generate_otp("9876543210").await;
        assert_eq!(h.delivery.last_code_for("9876543210"), Some(code.clone()));
        assert!(h.desk.validate_otp("9876543210", &code).await);

        let events = h.log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::OtpSend);
        assert_eq!(events[1].event_type, EventType::OtpVerify);
        assert_eq!(events[1].payload["result"], json!(true));
        for event in &events {
            assert!(!event.payload.to_string().contains(&code));
        }
    }

    #[tokio::test]
    async fn test_kyc_check_is_published_with_stated_address() {
        let h = connected_desk().await;

        let matched = h.desk.verify_customer("9876543210", "mumbai").await;
        let unknown = h.desk.verify_customer("0000000000", "Mumbai").await;

        assert!(matched.address_match());
        assert!(!unknown.is_verified());

        let events = h.log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::KycCheck);
        assert_eq!(
            events[0].payload["args"],
            json!({"phone_number": "9876543210", "stated_address": "mumbai"})
        );
        assert_eq!(events[0].payload["result"]["customer_id"], "CUST001");
        assert_eq!(events[1].payload["result"]["verified"], json!(false));
    }

    #[tokio::test]
    async fn test_offer_for_unknown_customer_is_recorded_as_error() {
        let h = connected_desk().await;

        let err = h.desk.check_offer("CUST999").await.unwrap_err();
        assert_eq!(err.customer_id, "CUST999");

        let events = h.log.events();
        assert_eq!(events[0].event_type, EventType::OfferCheck);
        assert_eq!(events[0].payload["result"]["Err"]["customer_id"], "CUST999");
    }

    #[tokio::test]
    async fn test_decisions_publish_one_event_each() {
        let h = connected_desk().await;

        let terms = h.desk.negotiate(600000.0, 500000.0).await;
        let verdict = h.desk.underwrite(750, 600000.0, 500000.0, 0.0).await;
        let sanctioned = h.desk.sanction("Arjun Sharma", 100000.0, 60, 14.0).await;

        assert_eq!(terms.interest_rate, 14.0);
        assert_eq!(verdict.decision, Decision::RequestSalarySlip);
        assert!(sanctioned.is_ok());

        let types: Vec<_> = h.log.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::Negotiation,
                EventType::Underwriting,
                EventType::SanctionGenerated,
            ]
        );
        assert_eq!(
            h.log.events()[2].payload["result"]["Ok"]["emi"],
            json!(2326.83)
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_from_config_loads_directory_once_and_stays_unstarted() {
        let customers_file = concat!(env!("CARGO_MANIFEST_DIR"), "/data/customers.json");
        let config = Config::from_lookup(|key| {
            (key == "CUSTOMERS_FILE").then(|| customers_file.to_string())
        })
        .unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let desk = tracing::subscriber::with_default(subscriber, || {
            LoanDesk::from_config(&config).unwrap()
        });

        assert!(desk.directory().find_by_id("CUST004").is_some());
        assert_eq!(desk.publisher().state(), ConnectionState::Disconnected);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("customer directory loaded").count(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_desk_still_answers() {
        let publisher = EventPublisher::new(
            Arc::new(TestConnector::new(Arc::new(TestEventLog::new()))),
            PublisherConfig::default(),
        );
        let desk = LoanDesk::new(
            Arc::new(OtpManager::new(Arc::new(RecordingDelivery::new()))),
            publisher,
            Arc::new(JsonCustomerDirectory::default()),
        );

        let verdict = desk.underwrite(650, 1000.0, 5000.0, 0.0).await;

        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.reason, "Credit score below 700");
    }
}
