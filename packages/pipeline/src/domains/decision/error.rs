use serde::Serialize;
use thiserror::Error;

/// Input-contract violations raised by the decision engine.
///
/// Serializable so a failed call can still be recorded as an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionError {
    /// EMI requested over a zero-month tenure
    #[error("tenure must be at least one month")]
    ZeroTenure,
}
