//! Decision domain data types
//!
//! Values returned to the caller and copied into events. Monetary fields keep
//! full precision in memory and are rounded when serialized.

use serde::{Deserialize, Serialize};

use crate::common::money::{serialize_currency, serialize_currency_opt};

/// Outcome of rate negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStatus {
    ApprovedBaseRate,
    ApprovedHigherRate,
}

/// Terms offered for a requested amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegotiationTerms {
    /// Annual nominal rate, in percent
    pub interest_rate: f64,
    pub status: NegotiationStatus,
    pub message: String,
}

/// Underwriting outcome tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
    /// Amount needs income proof; re-run once salary is known
    RequestSalarySlip,
}

/// Underwriting verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderwritingVerdict {
    pub decision: Decision,
    pub reason: String,
    /// Present only when the salary affordability check ran
    #[serde(
        serialize_with = "serialize_currency_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub emi: Option<f64>,
}

impl UnderwritingVerdict {
    pub(crate) fn new(decision: Decision, reason: &str) -> Self {
        Self {
            decision,
            reason: reason.to_string(),
            emi: None,
        }
    }

    pub(crate) fn with_emi(mut self, emi: f64) -> Self {
        self.emi = Some(emi);
        self
    }

    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approve
    }
}

/// Final sanctioned loan terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanctionTerms {
    pub customer_name: String,
    #[serde(serialize_with = "serialize_currency")]
    pub amount: f64,
    pub tenure_months: u32,
    pub interest_rate: f64,
    #[serde(serialize_with = "serialize_currency")]
    pub emi: f64,
}
