//! Ledger operations.
//!
//! Every operation runs inside one atomic unit of work obtained from the
//! store, checks its preconditions before the first mutation, and moves
//! balances and budget aggregates only through the effect apply/invert
//! paths in [`transactions`].

use crate::{RateTable, store::AtomicityStrategy};

mod transactions;
mod write;

pub use transactions::{AccountDrift, BudgetDrift, ConsistencyReport};

/// The transaction coordinator.
///
/// Generic over the atomicity strategy so the same operation code drives
/// both the in-memory store and the database store. Methods take `&self`
/// and are safe to call from concurrent tasks.
#[derive(Clone, Debug)]
pub struct Ledger<S> {
    store: S,
    rates: RateTable,
}

impl<S: AtomicityStrategy> Ledger<S> {
    /// Ledger with the built-in rate table.
    pub fn new(store: S) -> Self {
        Self {
            store,
            rates: RateTable::builtin(),
        }
    }

    pub fn with_rates(store: S, rates: RateTable) -> Self {
        Self { store, rates }
    }

    /// Direct access to the store, mainly for seeding in tests and tooling.
    pub fn store(&self) -> &S {
        &self.store
    }
}
