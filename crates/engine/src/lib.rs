//! Ledger consistency engine.
//!
//! Keeps two denormalized aggregates — account balances and monthly budget
//! spent totals — consistent with the transaction log while transactions
//! are created, updated, and deleted, across currencies and concurrent
//! callers. Entry point is [`Ledger`], generic over an
//! [`store::AtomicityStrategy`]: [`store::MemoryStore`] serializes units of
//! work behind a mutex, [`store::DbStore`] wraps them in database
//! transactions.

pub use accounts::Account;
pub use budgets::{Budget, BudgetMode};
pub use categories::{Category, CategoryKind};
pub use commands::{TransactionDraft, TransactionPatch};
pub use currency::{Currency, RateTable};
pub use error::LedgerError;
pub use ops::{AccountDrift, BudgetDrift, ConsistencyReport, Ledger};
pub use transactions::{Transaction, TransactionKind, year_month};

mod accounts;
mod budgets;
mod categories;
mod commands;
mod currency;
mod error;
mod ops;
pub mod store;
mod transactions;
mod util;

pub type LedgerResult<T> = Result<T, LedgerError>;
