//! Runtime error types

use std::time::Duration;
use thiserror::Error;

use core_kernel::{CustomerId, PortError};
use domain_billing::{BillingError, ProcessKey};

/// Errors raised while hosting billing period processes
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The customer has no registered period
    #[error("No billing period for customer {0}")]
    PeriodNotFound(CustomerId),

    /// The customer's current period is still Active
    #[error("Billing period {0} is still active")]
    AlreadyActive(ProcessKey),

    /// The start input was rejected by the domain
    #[error("Invalid billing period input: {0}")]
    InvalidInput(#[from] BillingError),

    /// The process task has stopped and no longer takes commands
    #[error("Billing period process {0} has stopped")]
    ProcessStopped(ProcessKey),

    /// The process did not answer in time
    #[error("{operation} on {key} timed out after {timeout:?}")]
    Timeout {
        key: ProcessKey,
        operation: &'static str,
        timeout: Duration,
    },

    /// The settlement could not be computed
    #[error("Settlement of {key} failed: {source}")]
    Settlement { key: ProcessKey, source: BillingError },

    /// The journal has no record of the process
    #[error("No journal entry for {0}")]
    HistoryNotFound(ProcessKey),
}

impl RuntimeError {
    /// Returns true if the error indicates a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RuntimeError::PeriodNotFound(_) | RuntimeError::HistoryNotFound(_)
        )
    }
}

impl From<RuntimeError> for PortError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::PeriodNotFound(customer) => PortError::not_found("BillingPeriod", customer),
            RuntimeError::HistoryNotFound(key) => PortError::not_found("ProcessHistory", key),
            RuntimeError::AlreadyActive(key) => {
                PortError::conflict(format!("billing period {key} is still active"))
            }
            RuntimeError::InvalidInput(e) => PortError::validation(e.to_string()),
            RuntimeError::ProcessStopped(key) => PortError::unavailable(key.to_string()),
            err @ RuntimeError::Settlement { .. } => PortError::internal(err.to_string()),
            RuntimeError::Timeout {
                key,
                operation,
                timeout,
            } => PortError::Timeout {
                operation: format!("{operation} on {key}"),
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }
}
