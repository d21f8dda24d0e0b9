use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::money::serialize_currency;

/// A customer record from the lookup dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub credit_score: u32,
    pub pre_approved_limit: f64,
}

/// Pre-approved offer for a customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferCheck {
    pub customer_id: String,
    #[serde(serialize_with = "serialize_currency")]
    pub pre_approved_limit: f64,
    pub product: String,
    pub valid_until: String,
}

/// Bureau score snapshot for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditCheck {
    pub customer_id: String,
    pub credit_score: u32,
    pub report_date: String,
}

/// Outcome of matching a caller's phone and stated address to the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KycCheck {
    Matched {
        verified: bool,
        phone_match: bool,
        /// Stated address and recorded address contain one another
        address_match: bool,
        customer_id: String,
        customer_name: String,
    },
    Unknown {
        verified: bool,
        reason: String,
    },
}

impl KycCheck {
    pub(crate) fn matched(customer: &Customer, address_match: bool) -> Self {
        KycCheck::Matched {
            verified: true,
            phone_match: true,
            address_match,
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
        }
    }

    pub(crate) fn unknown() -> Self {
        KycCheck::Unknown {
            verified: false,
            reason: "Customer not found in records".to_string(),
        }
    }

    /// Phone number belongs to a known customer.
    pub fn is_verified(&self) -> bool {
        matches!(self, KycCheck::Matched { .. })
    }

    pub fn address_match(&self) -> bool {
        matches!(self, KycCheck::Matched { address_match: true, .. })
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            KycCheck::Matched { customer_id, .. } => Some(customer_id),
            KycCheck::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Customer not found: {customer_id}")]
pub struct CustomerNotFound {
    pub customer_id: String,
}
