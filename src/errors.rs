use thiserror::Error;

use crate::decimal::Money;
use crate::types::FundsSource;

/// lifecycle processing errors
///
/// Variants carry enough structure for a caller to render the exact
/// shortfall or missing field, never a bare generic failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("insufficient {source}: available {available}, requested {requested}")]
    InsufficientFunds {
        source: FundsSource,
        available: Money,
        requested: Money,
    },

    #[error(
        "underpayment: monthly payment {monthly_payment}, penalty {penalty}, \
         total due {total_due}, provided {provided}"
    )]
    Underpayment {
        monthly_payment: Money,
        penalty: Money,
        total_due: Money,
        provided: Money,
    },

    #[error("transaction already resolved: {transaction_id}")]
    AlreadyResolved { transaction_id: String },

    /// conditional write refused because the key already holds a document
    #[error("document already exists at {path}")]
    Conflict { path: String },

    /// transport or backing-store failure; safe to retry the whole
    /// operation because resolution is idempotency-guarded
    #[error("store operation failed: {message}")]
    Store { message: String },

    #[error("invalid date: {input}")]
    InvalidDate { input: String },

    /// notification failure; logged by the dispatcher, never surfaced
    /// to the financial-operation caller
    #[error("notification delivery failed: {message}")]
    Delivery { message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
