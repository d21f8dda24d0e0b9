// Test doubles for the event plumbing
//
// Used by unit tests here and by the integration tests under tests/.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::consumer::{ProcessedRecord, RecordSink};
use super::nats::{EventLog, LogConnector, TestEventLog};

// =============================================================================
// Test Connector
// =============================================================================

/// Connector that fails a set number of times, then hands out a shared
/// [`TestEventLog`].
pub struct TestConnector {
    log: Arc<TestEventLog>,
    failures_remaining: AtomicUsize,
    attempts: AtomicUsize,
}

impl TestConnector {
    /// Connects on the first attempt.
    pub fn new(log: Arc<TestEventLog>) -> Self {
        Self::failing(log, 0)
    }

    /// Fails the first `failures` attempts.
    pub fn failing(log: Arc<TestEventLog>, failures: usize) -> Self {
        Self {
            log,
            failures_remaining: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of connection attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogConnector for TestConnector {
    async fn connect(&self) -> Result<Arc<dyn EventLog>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(anyhow!("broker unavailable"));
        }

        let log: Arc<dyn EventLog> = self.log.clone();
        Ok(log)
    }
}

// =============================================================================
// Collecting Sink
// =============================================================================

/// Record sink that keeps everything it is given.
#[derive(Default)]
pub struct CollectingSink {
    records: Mutex<Vec<ProcessedRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProcessedRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RecordSink for CollectingSink {
    fn emit(&self, record: &ProcessedRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
    }
}
