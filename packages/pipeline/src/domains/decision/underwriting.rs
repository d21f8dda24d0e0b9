//! Underwriting rules.
//!
//! Branch order matters: the credit-score gate is evaluated before any amount
//! check.

use tracing::debug;

use super::emi::amortize;
use super::types::{Decision, UnderwritingVerdict};

/// Minimum bureau score accepted.
pub const MIN_CREDIT_SCORE: u32 = 700;

/// Amounts up to this multiple of the limit may be approved on salary.
pub const LIMIT_MULTIPLIER: f64 = 2.0;

/// Tenure assumed for the salary affordability check.
pub const AFFORDABILITY_TENURE_MONTHS: u32 = 60;

/// Annual rate assumed for the salary affordability check.
pub const AFFORDABILITY_RATE: f64 = 14.0;

/// Largest share of monthly salary the EMI may take.
pub const MAX_EMI_TO_SALARY: f64 = 0.5;

/// Evaluate a loan application.
///
/// A `monthly_salary` that is not positive (zero, negative or NaN) means
/// "not provided yet".
pub fn underwrite(
    credit_score: u32,
    requested_amount: f64,
    pre_approved_limit: f64,
    monthly_salary: f64,
) -> UnderwritingVerdict {
    if credit_score < MIN_CREDIT_SCORE {
        return UnderwritingVerdict::new(Decision::Reject, "Credit score below 700");
    }

    if requested_amount <= pre_approved_limit {
        return UnderwritingVerdict::new(Decision::Approve, "Within pre-approved limit");
    }

    if requested_amount <= LIMIT_MULTIPLIER * pre_approved_limit {
        if monthly_salary.is_nan() || monthly_salary <= 0.0 {
            return UnderwritingVerdict::new(
                Decision::RequestSalarySlip,
                "Amount > limit but <= 2x limit. Need salary slip.",
            );
        }

        let emi = amortize(
            requested_amount,
            AFFORDABILITY_RATE,
            AFFORDABILITY_TENURE_MONTHS,
        );
        debug!(emi, monthly_salary, "salary affordability check");

        return if emi <= MAX_EMI_TO_SALARY * monthly_salary {
            UnderwritingVerdict::new(Decision::Approve, "Salary supports EMI").with_emi(emi)
        } else {
            UnderwritingVerdict::new(Decision::Reject, "EMI exceeds 50% of monthly salary")
                .with_emi(emi)
        };
    }

    UnderwritingVerdict::new(Decision::Reject, "Amount exceeds 2x pre-approved limit")
}
