//! In-memory store with an optional JSON snapshot on disk.
//!
//! All state sits behind one `tokio` mutex, so units of work are serialized:
//! a context holds the guard for its whole lifetime and no two writers ever
//! interleave. There is no rollback — operations validate everything before
//! the first mutation, and the snapshot (when configured) is written only
//! after the work closure succeeds, so a failed unit leaves the file at the
//! previous consistent state.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    LedgerError, LedgerResult,
    accounts::Account,
    budgets::Budget,
    categories::Category,
    store::{
        AccountRepository, AtomicityStrategy, BudgetRepository, CategoryRepository,
        LedgerContext, TransactionStore,
    },
    transactions::Transaction,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    categories: HashMap<Uuid, Category>,
    budgets: HashMap<Uuid, Budget>,
    transactions: HashMap<Uuid, Transaction>,
}

#[derive(Clone, Debug)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Fresh store with no on-disk snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            snapshot: None,
        }
    }

    /// Loads the snapshot at `path`, or starts empty when the file does not
    /// exist yet. Successful units of work rewrite the snapshot.
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|err| {
                LedgerError::Storage(format!("read snapshot {}: {err}", path.display()))
            })?;
            serde_json::from_str(&raw).map_err(|err| {
                LedgerError::Storage(format!("parse snapshot {}: {err}", path.display()))
            })?
        } else {
            MemoryState::default()
        };
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot: Some(path),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicityStrategy for MemoryStore {
    type Ctx = MemoryContext;

    async fn run_atomic<T, F>(&self, work: F) -> LedgerResult<T>
    where
        F: AsyncFn(&mut Self::Ctx) -> LedgerResult<T>,
    {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let mut ctx = MemoryContext { state: guard };
        let out = work(&mut ctx).await?;
        if let Some(path) = &self.snapshot {
            ctx.persist(path)?;
        }
        Ok(out)
    }
}

/// A unit of work holding the store lock.
pub struct MemoryContext {
    state: OwnedMutexGuard<MemoryState>,
}

impl MemoryContext {
    fn persist(&self, path: &Path) -> LedgerResult<()> {
        let raw = serde_json::to_string_pretty(&*self.state)
            .map_err(|err| LedgerError::Storage(format!("encode snapshot: {err}")))?;
        fs::write(path, raw).map_err(|err| {
            LedgerError::Storage(format!("write snapshot {}: {err}", path.display()))
        })
    }
}

impl AccountRepository for MemoryContext {
    async fn account(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Account>> {
        Ok(self
            .state
            .accounts
            .get(&id)
            .filter(|account| account.owner_id == owner_id)
            .cloned())
    }

    async fn accounts(&self, owner_id: &str) -> LedgerResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .state
            .accounts
            .values()
            .filter(|account| account.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn adjust_balance(
        &mut self,
        owner_id: &str,
        id: Uuid,
        delta_minor: i64,
    ) -> LedgerResult<()> {
        let account = self
            .state
            .accounts
            .get_mut(&id)
            .filter(|account| account.owner_id == owner_id)
            .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))?;
        account.balance_minor += delta_minor;
        Ok(())
    }
}

impl CategoryRepository for MemoryContext {
    async fn category(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Category>> {
        Ok(self
            .state
            .categories
            .get(&id)
            .filter(|category| category.owner_id == owner_id)
            .cloned())
    }

    async fn insert_category(&mut self, category: &Category) -> LedgerResult<()> {
        self.state.categories.insert(category.id, category.clone());
        Ok(())
    }
}

impl BudgetRepository for MemoryContext {
    async fn budget(
        &self,
        owner_id: &str,
        category_id: Uuid,
        month: &str,
    ) -> LedgerResult<Option<Budget>> {
        Ok(self
            .state
            .budgets
            .values()
            .find(|budget| {
                budget.owner_id == owner_id
                    && budget.category_id == category_id
                    && budget.month == month
            })
            .cloned())
    }

    async fn budgets(&self, owner_id: &str) -> LedgerResult<Vec<Budget>> {
        let mut budgets: Vec<Budget> = self
            .state
            .budgets
            .values()
            .filter(|budget| budget.owner_id == owner_id)
            .cloned()
            .collect();
        budgets.sort_by(|a, b| a.month.cmp(&b.month).then(a.id.cmp(&b.id)));
        Ok(budgets)
    }

    async fn insert_budget(&mut self, budget: &Budget) -> LedgerResult<()> {
        self.state.budgets.insert(budget.id, budget.clone());
        Ok(())
    }

    async fn adjust_spent(
        &mut self,
        owner_id: &str,
        id: Uuid,
        delta_minor: i64,
    ) -> LedgerResult<()> {
        let budget = self
            .state
            .budgets
            .get_mut(&id)
            .filter(|budget| budget.owner_id == owner_id)
            .ok_or_else(|| LedgerError::NotFound(format!("budget {id}")))?;
        budget.spent_minor = (budget.spent_minor + delta_minor).max(0);
        Ok(())
    }
}

impl TransactionStore for MemoryContext {
    async fn transaction(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .state
            .transactions
            .get(&id)
            .filter(|tx| tx.owner_id == owner_id)
            .cloned())
    }

    async fn transactions(&self, owner_id: &str) -> LedgerResult<Vec<Transaction>> {
        let mut txs: Vec<Transaction> = self
            .state
            .transactions
            .values()
            .filter(|tx| tx.owner_id == owner_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(txs)
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> LedgerResult<()> {
        self.state.transactions.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn update_transaction(&mut self, tx: &Transaction) -> LedgerResult<()> {
        let slot = self
            .state
            .transactions
            .get_mut(&tx.id)
            .filter(|stored| stored.owner_id == tx.owner_id)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", tx.id)))?;
        *slot = tx.clone();
        Ok(())
    }

    async fn delete_transaction(&mut self, owner_id: &str, id: Uuid) -> LedgerResult<()> {
        let owned = self
            .state
            .transactions
            .get(&id)
            .is_some_and(|tx| tx.owner_id == owner_id);
        if !owned {
            return Err(LedgerError::NotFound(format!("transaction {id}")));
        }
        self.state.transactions.remove(&id);
        Ok(())
    }
}

impl LedgerContext for MemoryContext {}
