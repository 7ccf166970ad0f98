//! The module contains the errors the ledger engine can return.
//!
//! The taxonomy matches the engine contract:
//!
//! - [`Validation`] for payloads rejected before any mutation.
//! - [`NotFound`] for unknown ids or ownership mismatches.
//! - [`Conflict`] when the transactional backend exhausted its retries;
//!   the caller may retry the whole operation.
//!
//! [`Validation`]: LedgerError::Validation
//! [`NotFound`]: LedgerError::NotFound
//! [`Conflict`]: LedgerError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger engine errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid payload: {0}")]
    Validation(String),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("Write conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
