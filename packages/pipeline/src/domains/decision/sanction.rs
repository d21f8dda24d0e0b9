use tracing::info;

use super::emi::compute_emi;
use super::error::DecisionError;
use super::types::SanctionTerms;

/// Compute the final installment and fix the sanctioned terms.
pub fn sanction(
    customer_name: &str,
    amount: f64,
    tenure_months: u32,
    interest_rate: f64,
) -> Result<SanctionTerms, DecisionError> {
    let emi = compute_emi(amount, interest_rate, tenure_months)?;

    info!(
        customer = %customer_name,
        amount,
        tenure_months,
        interest_rate,
        "loan sanctioned"
    );

    Ok(SanctionTerms {
        customer_name: customer_name.to_string(),
        amount,
        tenure_months,
        interest_rate,
        emi,
    })
}
