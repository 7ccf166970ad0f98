//! SQL-backed store.
//!
//! Each unit of work runs inside one database transaction: the context wraps
//! a [`DatabaseTransaction`], mutations go through partial `ActiveModel`
//! updates, and the strategy commits on success or rolls back on error.
//! Transient failures (SQLite lock contention, deadlocks) are retried a
//! bounded number of times with a fresh transaction before surfacing as a
//! write conflict.

use sea_orm::{
    ActiveValue, DatabaseConnection, DatabaseTransaction, DbErr, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    LedgerError, LedgerResult,
    accounts::{self, Account},
    budgets::{self, Budget},
    categories::{self, Category},
    store::{
        AccountRepository, AtomicityStrategy, BudgetRepository, CategoryRepository,
        LedgerContext, TransactionStore,
    },
    transactions::{self, Transaction},
};

const MAX_ATTEMPTS: u32 = 3;

/// Failures a fresh transaction may not hit again. Unique-index violations
/// count: two writers racing the budget auto-create lose to the index, and
/// the retry re-reads the row the winner inserted and takes the
/// adjust-spent path instead.
fn is_transient(err: &DbErr) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("database is locked")
        || msg.contains("deadlock")
        || msg.contains("serialization")
        || msg.contains("unique constraint")
        || msg.contains("duplicate key")
}

#[derive(Clone, Debug)]
pub struct DbStore {
    conn: DatabaseConnection,
}

impl DbStore {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

impl AtomicityStrategy for DbStore {
    type Ctx = DbContext;

    async fn run_atomic<T, F>(&self, work: F) -> LedgerResult<T>
    where
        F: AsyncFn(&mut Self::Ctx) -> LedgerResult<T>,
    {
        let mut attempt: u32 = 1;
        loop {
            let txn = self.conn.begin().await.map_err(LedgerError::Database)?;
            let mut ctx = DbContext { txn };
            let transient = match work(&mut ctx).await {
                Ok(value) => match ctx.txn.commit().await {
                    Ok(()) => return Ok(value),
                    Err(err) if is_transient(&err) => err,
                    Err(err) => return Err(err.into()),
                },
                Err(err) => {
                    if let Err(rb) = ctx.txn.rollback().await {
                        tracing::warn!(error = %rb, "rollback failed");
                    }
                    match err {
                        LedgerError::Database(db) if is_transient(&db) => db,
                        other => return Err(other),
                    }
                }
            };
            if attempt >= MAX_ATTEMPTS {
                return Err(LedgerError::Conflict(format!(
                    "storage busy after {MAX_ATTEMPTS} attempts: {transient}"
                )));
            }
            tracing::debug!(attempt, error = %transient, "retrying unit of work");
            attempt += 1;
        }
    }
}

/// A unit of work wrapping one database transaction.
pub struct DbContext {
    txn: DatabaseTransaction,
}

impl AccountRepository for DbContext {
    async fn account(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Account>> {
        accounts::Entity::find_by_id(id.to_string())
            .filter(accounts::Column::OwnerId.eq(owner_id))
            .one(&self.txn)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn accounts(&self, owner_id: &str) -> LedgerResult<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner_id))
            .order_by_asc(accounts::Column::Name)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()> {
        accounts::ActiveModel::from(account).insert(&self.txn).await?;
        Ok(())
    }

    async fn adjust_balance(
        &mut self,
        owner_id: &str,
        id: Uuid,
        delta_minor: i64,
    ) -> LedgerResult<()> {
        let model = accounts::Entity::find_by_id(id.to_string())
            .filter(accounts::Column::OwnerId.eq(owner_id))
            .one(&self.txn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))?;
        let update = accounts::ActiveModel {
            id: ActiveValue::Set(model.id),
            balance_minor: ActiveValue::Set(model.balance_minor + delta_minor),
            ..Default::default()
        };
        update.update(&self.txn).await?;
        Ok(())
    }
}

impl CategoryRepository for DbContext {
    async fn category(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Category>> {
        categories::Entity::find_by_id(id.to_string())
            .filter(categories::Column::OwnerId.eq(owner_id))
            .one(&self.txn)
            .await?
            .map(Category::try_from)
            .transpose()
    }

    async fn insert_category(&mut self, category: &Category) -> LedgerResult<()> {
        categories::ActiveModel::from(category)
            .insert(&self.txn)
            .await?;
        Ok(())
    }
}

impl BudgetRepository for DbContext {
    async fn budget(
        &self,
        owner_id: &str,
        category_id: Uuid,
        month: &str,
    ) -> LedgerResult<Option<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .filter(budgets::Column::CategoryId.eq(category_id.to_string()))
            .filter(budgets::Column::Month.eq(month))
            .one(&self.txn)
            .await?
            .map(Budget::try_from)
            .transpose()
    }

    async fn budgets(&self, owner_id: &str) -> LedgerResult<Vec<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .order_by_asc(budgets::Column::Month)
            .order_by_asc(budgets::Column::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect()
    }

    async fn insert_budget(&mut self, budget: &Budget) -> LedgerResult<()> {
        budgets::ActiveModel::from(budget).insert(&self.txn).await?;
        Ok(())
    }

    async fn adjust_spent(
        &mut self,
        owner_id: &str,
        id: Uuid,
        delta_minor: i64,
    ) -> LedgerResult<()> {
        let model = budgets::Entity::find_by_id(id.to_string())
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .one(&self.txn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("budget {id}")))?;
        let update = budgets::ActiveModel {
            id: ActiveValue::Set(model.id),
            spent_minor: ActiveValue::Set((model.spent_minor + delta_minor).max(0)),
            ..Default::default()
        };
        update.update(&self.txn).await?;
        Ok(())
    }
}

impl TransactionStore for DbContext {
    async fn transaction(&self, owner_id: &str, id: Uuid) -> LedgerResult<Option<Transaction>> {
        transactions::Entity::find_by_id(id.to_string())
            .filter(transactions::Column::OwnerId.eq(owner_id))
            .one(&self.txn)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn transactions(&self, owner_id: &str) -> LedgerResult<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(owner_id))
            .order_by_asc(transactions::Column::Date)
            .order_by_asc(transactions::Column::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> LedgerResult<()> {
        transactions::ActiveModel::from(tx).insert(&self.txn).await?;
        Ok(())
    }

    async fn update_transaction(&mut self, tx: &Transaction) -> LedgerResult<()> {
        match transactions::ActiveModel::from(tx).update(&self.txn).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => {
                Err(LedgerError::NotFound(format!("transaction {}", tx.id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_transaction(&mut self, owner_id: &str, id: Uuid) -> LedgerResult<()> {
        let res = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id.to_string()))
            .filter(transactions::Column::OwnerId.eq(owner_id))
            .exec(&self.txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(LedgerError::NotFound(format!("transaction {id}")));
        }
        Ok(())
    }
}

impl LedgerContext for DbContext {}
