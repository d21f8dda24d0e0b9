//! Customers domain - read-only KYC, offer and credit lookups
//!
//! The dataset is owned elsewhere; this process only reads it.

pub mod checks;
pub mod directory;
pub mod models;

pub use checks::{check_credit, check_offer, verify_customer};
pub use directory::{CustomerDirectory, DirectoryError, JsonCustomerDirectory};
pub use models::{CreditCheck, Customer, CustomerNotFound, KycCheck, OfferCheck};
