//! Storage abstraction.
//!
//! Write operations run against a short-lived *context* that represents one
//! atomic unit of work. How atomicity is achieved is up to the strategy:
//! the in-memory store serializes writers behind a mutex, the database store
//! wraps each unit in a SQL transaction and retries transient failures.
//!
//! Contexts expose narrow repository traits rather than raw storage so the
//! operations in [`crate::ops`] read the same against either backend.

use uuid::Uuid;

use crate::{
    LedgerResult,
    accounts::Account,
    budgets::Budget,
    categories::Category,
    transactions::Transaction,
};

pub mod database;
pub mod memory;

pub use database::{DbContext, DbStore};
pub use memory::{MemoryContext, MemoryStore};

/// Account lookups and the balance mutation path.
///
/// `adjust_balance` is the only way a balance changes; operations never
/// write an absolute balance.
#[allow(async_fn_in_trait)]
pub trait AccountRepository {
    async fn account(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Account>>;

    async fn accounts(&self, owner_id: &str) -> LedgerResult<Vec<Account>>;

    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Adds `delta_minor` (may be negative) to the stored balance.
    ///
    /// Fails with [`crate::LedgerError::NotFound`] when the account is gone.
    async fn adjust_balance(&mut self, owner_id: &str, id: Uuid, delta_minor: i64)
    -> LedgerResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait CategoryRepository {
    async fn category(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Category>>;

    async fn insert_category(&mut self, category: &Category) -> LedgerResult<()>;
}

/// Budget lookups keyed by (owner, category, month) plus the spent mutation
/// path. Like balances, `spent_minor` only ever moves by deltas.
#[allow(async_fn_in_trait)]
pub trait BudgetRepository {
    async fn budget(
        &self,
        owner_id: &str,
        category_id: Uuid,
        month: &str,
    ) -> LedgerResult<Option<Budget>>;

    async fn budgets(&self, owner_id: &str) -> LedgerResult<Vec<Budget>>;

    async fn insert_budget(&mut self, budget: &Budget) -> LedgerResult<()>;

    /// Adds `delta_minor` to `spent_minor`, clamping the result at zero.
    async fn adjust_spent(&mut self, owner_id: &str, id: Uuid, delta_minor: i64)
    -> LedgerResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait TransactionStore {
    async fn transaction(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Transaction>>;

    async fn transactions(&self, owner_id: &str) -> LedgerResult<Vec<Transaction>>;

    async fn insert_transaction(&mut self, tx: &Transaction) -> LedgerResult<()>;

    /// Rewrites the stored row for `tx.id`.
    async fn update_transaction(&mut self, tx: &Transaction) -> LedgerResult<()>;

    async fn delete_transaction(&mut self, owner_id: &str, id: Uuid) -> LedgerResult<()>;
}

/// Everything a write operation needs from its atomic context.
pub trait LedgerContext:
    AccountRepository + CategoryRepository + BudgetRepository + TransactionStore
{
}

/// Runs units of work atomically: either every mutation made through the
/// context lands, or none do.
#[allow(async_fn_in_trait)]
pub trait AtomicityStrategy {
    type Ctx: LedgerContext;

    /// Executes `work` inside one atomic unit.
    ///
    /// The closure may be invoked more than once: strategies that detect a
    /// transient conflict roll back and retry with a fresh context, so the
    /// work must not carry side effects outside the context.
    async fn run_atomic<T, F>(&self, work: F) -> LedgerResult<T>
    where
        F: AsyncFn(&mut Self::Ctx) -> LedgerResult<T>;
}
