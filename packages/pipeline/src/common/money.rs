//! Currency presentation helpers.
//!
//! Amounts are carried at full `f64` precision through every calculation and
//! rounded to paise only when they leave the process (serialization, CLI
//! output).

use serde::Serializer;

/// Round to two decimal places.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `serialize_with` helper that rounds an amount on the way out.
pub fn serialize_currency<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_currency(*value))
}

/// `serialize_with` helper for optional amounts.
pub fn serialize_currency_opt<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&round_currency(*v)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(2326.8278), 2326.83);
        assert_eq!(round_currency(1666.6666), 1666.67);
        assert_eq!(round_currency(100.0), 100.0);
    }
}
