//! Loan origination and collections backend.
//!
//! Two subsystems live here: the application status workflow engine
//! (`workflows::status`), which drives credit applications through numbered
//! status codes via rule-gated handlers, and the outbound dialer pipeline
//! (`dialer`), which selects delinquent accounts, uploads call batches to a
//! voice vendor, and reconciles asynchronous call results.

pub mod config;
pub mod dialer;
pub mod error;
pub mod infra;
pub mod routes;
pub mod telemetry;
pub mod workflows;

mod cli;
mod server;

use error::AppError;

/// Entry point used by the `loanflow` binary.
pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
