//! The module contains the errors the store can raise.
//!
//! The two kinds worth calling out:
//!
//! - [`StaleRecord`] raised when a record id no longer resolves, instead of
//!   quietly handing back zeroed data.
//! - [`TransactionAborted`] raised when a write-transaction body fails; it
//!   carries the cause and guarantees no partial commit happened.
//!
//!  [`StaleRecord`]: LedgerError::StaleRecord
//!  [`TransactionAborted`]: LedgerError::TransactionAborted
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("\"{0}\" is gone from the store!")]
    StaleRecord(String),
    #[error("write transaction rolled back: {0}")]
    TransactionAborted(#[source] Box<LedgerError>),
    #[error("\"{0}\" matches more than one holding!")]
    AmbiguousHolding(String),
    #[error("not a number: {0:?}")]
    InvalidNumeric(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// The error for a record id that no longer resolves.
pub(crate) fn stale(kind: &str, id: Uuid) -> LedgerError {
    LedgerError::StaleRecord(format!("{kind} {id}"))
}

impl LedgerError {
    /// Wrap a failed write-transaction body, keeping the cause as source.
    pub(crate) fn aborted(cause: LedgerError) -> Self {
        Self::TransactionAborted(Box::new(cause))
    }

    /// The error a write rolled back with, if this is an aborted write.
    pub fn abort_cause(&self) -> Option<&LedgerError> {
        match self {
            Self::TransactionAborted(cause) => Some(cause),
            _ => None,
        }
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::StaleRecord(a), Self::StaleRecord(b)) => a == b,
            (Self::TransactionAborted(a), Self::TransactionAborted(b)) => a == b,
            (Self::AmbiguousHolding(a), Self::AmbiguousHolding(b)) => a == b,
            (Self::InvalidNumeric(a), Self::InvalidNumeric(b)) => a == b,
            (Self::InvalidRecord(a), Self::InvalidRecord(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
