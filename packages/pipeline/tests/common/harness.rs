//! Loan desk wired to in-memory test doubles.

use std::sync::Arc;
use std::time::Duration;

use pipeline_core::common::ManualClock;
use pipeline_core::domains::verification::{OtpManager, RecordingDelivery};
use pipeline_core::kernel::{
    ConnectionState, EventPublisher, PublisherConfig, TestConnector, TestEventLog,
};
use pipeline_core::LoanDesk;

use super::fixtures::bundled_directory;

pub const TEST_TOPIC: &str = "test_capital_connect_events";

pub struct TestHarness {
    pub desk: LoanDesk,
    pub log: Arc<TestEventLog>,
    pub connector: Arc<TestConnector>,
    pub delivery: Arc<RecordingDelivery>,
    pub clock: ManualClock,
}

impl TestHarness {
    /// Desk whose publisher has not been started.
    pub fn new() -> Self {
        Self::with_failing_connects(0)
    }

    /// Desk whose connector fails `failures` times before connecting.
    pub fn with_failing_connects(failures: usize) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let log = Arc::new(TestEventLog::new());
        let connector = Arc::new(TestConnector::failing(log.clone(), failures));
        let delivery = Arc::new(RecordingDelivery::new());
        let clock = ManualClock::starting_now();

        let publisher = EventPublisher::new(
            connector.clone(),
            PublisherConfig {
                topic: TEST_TOPIC.to_string(),
                retry_interval: Duration::from_secs(5),
            },
        );
        let otp = OtpManager::new(delivery.clone()).with_clock(Arc::new(clock.clone()));
        let desk = LoanDesk::new(Arc::new(otp), publisher, Arc::new(bundled_directory()));

        Self {
            desk,
            log,
            connector,
            delivery,
            clock,
        }
    }

    /// Desk with its publisher started and connected.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.desk.publisher().start();
        harness
            .desk
            .publisher()
            .wait_for_state(ConnectionState::Connected)
            .await;
        harness
    }
}
