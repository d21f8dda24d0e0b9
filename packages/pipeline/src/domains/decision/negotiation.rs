use super::types::{NegotiationStatus, NegotiationTerms};

/// Annual rate for amounts within the pre-approved limit.
pub const BASE_RATE: f64 = 12.0;

/// Annual rate for amounts above the pre-approved limit.
pub const HIGHER_RATE: f64 = 14.0;

/// Price a requested amount against the customer's pre-approved limit.
pub fn negotiate(requested_amount: f64, pre_approved_limit: f64) -> NegotiationTerms {
    if requested_amount <= pre_approved_limit {
        NegotiationTerms {
            interest_rate: BASE_RATE,
            status: NegotiationStatus::ApprovedBaseRate,
            message: "We can offer you this loan at our best rate of 12% per annum.".to_string(),
        }
    } else {
        NegotiationTerms {
            interest_rate: HIGHER_RATE,
            status: NegotiationStatus::ApprovedHigherRate,
            message: "Since this amount exceeds your pre-approved limit, we can offer it at a rate of 14% per annum.".to_string(),
        }
    }
}
