//! Test fixtures: the bundled customer dataset and event messages.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use pipeline_core::domains::customers::JsonCustomerDirectory;
use pipeline_core::kernel::{InboundMessage, PublishedMessage};

/// Path of the customer dataset shipped with the crate.
pub fn customers_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/customers.json")
}

pub fn bundled_directory() -> JsonCustomerDirectory {
    JsonCustomerDirectory::from_path(customers_path()).expect("bundled customers load")
}

/// In-memory message that counts acknowledgements.
pub struct FixtureMessage {
    pub payload: Vec<u8>,
    pub acks: Arc<AtomicUsize>,
}

#[async_trait]
impl InboundMessage for FixtureMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn acknowledge(&self) -> Result<()> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replay published messages as inbound ones sharing an ack counter.
pub fn replay(
    published: Vec<PublishedMessage>,
    acks: &Arc<AtomicUsize>,
) -> Vec<Result<FixtureMessage, String>> {
    published
        .into_iter()
        .map(|m| {
            Ok(FixtureMessage {
                payload: m.payload.to_vec(),
                acks: acks.clone(),
            })
        })
        .collect()
}
