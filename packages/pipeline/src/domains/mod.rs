pub mod customers;
pub mod decision;
pub mod verification;
