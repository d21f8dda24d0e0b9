//! Decision domain - loan negotiation, underwriting and sanction terms
//!
//! Everything here is a pure function of its inputs. Rates and thresholds are
//! fixed business rules.

pub mod emi;
pub mod error;
pub mod negotiation;
pub mod sanction;
pub mod types;
pub mod underwriting;

pub use emi::compute_emi;
pub use error::DecisionError;
pub use negotiation::negotiate;
pub use sanction::sanction;
pub use types::*;
pub use underwriting::underwrite;
