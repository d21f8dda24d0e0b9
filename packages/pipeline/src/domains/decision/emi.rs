//! Equated monthly installment (EMI) amortization.

use super::error::DecisionError;

/// Monthly installment that amortizes `principal` over `tenure_months` at an
/// annual nominal rate of `annual_rate_percent`.
///
/// A zero or negative rate degenerates to straight division. The result is
/// not rounded.
pub fn compute_emi(
    principal: f64,
    annual_rate_percent: f64,
    tenure_months: u32,
) -> Result<f64, DecisionError> {
    if tenure_months == 0 {
        return Err(DecisionError::ZeroTenure);
    }
    Ok(amortize(principal, annual_rate_percent, tenure_months))
}

/// Caller guarantees `tenure_months > 0`.
pub(crate) fn amortize(principal: f64, annual_rate_percent: f64, tenure_months: u32) -> f64 {
    debug_assert!(tenure_months > 0);
    let monthly_rate = annual_rate_percent / 12.0 / 100.0;
    let n = f64::from(tenure_months);

    if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(n);
        principal * monthly_rate * growth / (growth - 1.0)
    } else {
        principal / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::round_currency;

    #[test]
    fn test_standard_amortization() {
        let emi = compute_emi(100_000.0, 14.0, 60).unwrap();
        assert_eq!(round_currency(emi), 2326.83);
    }

    #[test]
    fn test_twelve_percent_two_years() {
        let emi = compute_emi(200_000.0, 12.0, 24).unwrap();
        assert_eq!(round_currency(emi), 9414.69);
    }

    #[test]
    fn test_zero_rate_is_straight_division() {
        assert_eq!(compute_emi(120_000.0, 0.0, 12).unwrap(), 10_000.0);
        assert_eq!(compute_emi(100_000.0, 0.0, 7).unwrap(), 100_000.0 / 7.0);
    }

    #[test]
    fn test_zero_tenure_is_an_error() {
        assert_eq!(compute_emi(100_000.0, 14.0, 0), Err(DecisionError::ZeroTenure));
        assert_eq!(compute_emi(100_000.0, 0.0, 0), Err(DecisionError::ZeroTenure));
    }

    #[test]
    fn test_result_is_not_rounded() {
        let emi = compute_emi(100_000.0, 14.0, 60).unwrap();
        assert_ne!(emi, round_currency(emi));
    }

    #[test]
    fn test_single_month_repays_principal_plus_one_month_interest() {
        let emi = compute_emi(1_200.0, 12.0, 1).unwrap();
        assert!((emi - 1_212.0).abs() < 1e-9);
    }
}
