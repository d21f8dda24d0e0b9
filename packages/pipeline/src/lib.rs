// Capital Connect - Loan Decision Pipeline
//
// OTP verification, loan decisioning and best-effort event publishing to a
// durable log, plus the stream processor that consumes those events.
//
// Domain logic lives in domains/*; event plumbing lives in kernel/.

pub mod common;
pub mod config;
pub mod desk;
pub mod domains;
pub mod kernel;

pub use config::*;
pub use desk::LoanDesk;
