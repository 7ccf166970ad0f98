//! Effects and transaction reads.
//!
//! An [`Effect`] is what a stored transaction does to the denormalized
//! aggregates: one signed balance delta (already converted into the account
//! currency) and, for categorized expenses, one budget accrual. Applying and
//! inverting effects are the only paths that move a balance or a budget's
//! spent total, so create/update/delete all compose from the same two
//! primitives.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    Account, Budget, Currency, LedgerError, LedgerResult, RateTable, Transaction,
    TransactionKind,
    store::{
        AccountRepository, AtomicityStrategy, BudgetRepository, LedgerContext, TransactionStore,
    },
};

use super::Ledger;

/// Budget-side part of an effect. The amount stays in the transaction
/// currency; it is converted into the budget currency only at application
/// time, because the target budget (and hence its currency) may not exist
/// until then.
#[derive(Clone, Debug)]
pub(crate) struct Accrual {
    pub category_id: Uuid,
    pub month: String,
    pub amount_minor: i64,
    pub currency: Currency,
    /// Currency a freshly auto-created budget adopts: the account currency.
    pub fallback_currency: Currency,
}

#[derive(Clone, Debug)]
pub(crate) struct Effect {
    pub account_id: Uuid,
    /// Signed delta in the account currency.
    pub balance_delta_minor: i64,
    pub accrual: Option<Accrual>,
}

pub(crate) fn effect_of(tx: &Transaction, account: &Account, rates: &RateTable) -> Effect {
    let converted = rates.convert_minor(tx.amount_minor, tx.currency, account.currency);
    let accrual = match (tx.kind, tx.category_id) {
        (TransactionKind::Expense, Some(category_id)) => Some(Accrual {
            category_id,
            month: tx.month(),
            amount_minor: tx.amount_minor,
            currency: tx.currency,
            fallback_currency: account.currency,
        }),
        _ => None,
    };
    Effect {
        account_id: account.id,
        balance_delta_minor: tx.kind.sign() * converted,
        accrual,
    }
}

/// Applies an effect: moves the balance and accrues into the month budget,
/// auto-creating the budget (limit zero, account currency) on the first
/// categorized expense of a month.
pub(crate) async fn apply_effect<C: LedgerContext>(
    ctx: &mut C,
    rates: &RateTable,
    owner_id: &str,
    effect: &Effect,
) -> LedgerResult<()> {
    ctx.adjust_balance(owner_id, effect.account_id, effect.balance_delta_minor)
        .await?;
    let Some(accrual) = &effect.accrual else {
        return Ok(());
    };
    match ctx
        .budget(owner_id, accrual.category_id, &accrual.month)
        .await?
    {
        Some(budget) => {
            let delta = rates.convert_minor(accrual.amount_minor, accrual.currency, budget.currency);
            ctx.adjust_spent(owner_id, budget.id, delta).await?;
        }
        None => {
            let mut budget = Budget::auto_created(
                owner_id,
                accrual.category_id,
                accrual.month.clone(),
                accrual.fallback_currency,
            );
            budget.spent_minor =
                rates.convert_minor(accrual.amount_minor, accrual.currency, budget.currency);
            tracing::debug!(budget_id = %budget.id, month = %budget.month, "auto-created budget");
            ctx.insert_budget(&budget).await?;
        }
    }
    Ok(())
}

/// Undoes what a stored transaction did to the aggregates, best effort.
///
/// Works from the row itself rather than a precomputed [`Effect`] because
/// the referenced account may have vanished since the effect was applied:
/// a missing account skips the balance rollback but the budget rollback
/// still runs. A missing budget is likewise skipped, the spent total is
/// clamped at zero by the store, and no budget is ever auto-created here.
pub(crate) async fn invert_transaction<C: LedgerContext>(
    ctx: &mut C,
    rates: &RateTable,
    owner_id: &str,
    tx: &Transaction,
) -> LedgerResult<()> {
    match ctx.account(owner_id, tx.account_id).await? {
        Some(account) => {
            let converted = rates.convert_minor(tx.amount_minor, tx.currency, account.currency);
            ctx.adjust_balance(owner_id, account.id, -(tx.kind.sign() * converted))
                .await?;
        }
        None => {
            tracing::debug!(account_id = %tx.account_id, "account gone, skipping balance rollback");
        }
    }
    if tx.kind != TransactionKind::Expense {
        return Ok(());
    }
    let Some(category_id) = tx.category_id else {
        return Ok(());
    };
    let month = tx.month();
    match ctx.budget(owner_id, category_id, &month).await? {
        Some(budget) => {
            let delta = rates.convert_minor(tx.amount_minor, tx.currency, budget.currency);
            ctx.adjust_spent(owner_id, budget.id, -delta).await?;
        }
        None => {
            tracing::debug!(
                category_id = %category_id,
                month = %month,
                "budget gone, skipping spent rollback"
            );
        }
    }
    Ok(())
}

/// Stored-vs-recomputed mismatch for one account balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountDrift {
    pub account_id: Uuid,
    pub stored_minor: i64,
    pub expected_minor: i64,
}

/// Stored-vs-recomputed mismatch for one budget's spent total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetDrift {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub month: String,
    pub stored_minor: i64,
    pub expected_minor: i64,
}

/// Result of replaying the transaction log against the stored aggregates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub accounts: Vec<AccountDrift>,
    pub budgets: Vec<BudgetDrift>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.accounts.is_empty() && self.budgets.is_empty()
    }
}

/// Replays every transaction and diffs the recomputed aggregates against
/// the stored ones. Balances recompute from the account's opening amount;
/// spent totals recompute from zero.
async fn drift_report<C: LedgerContext>(
    ctx: &C,
    rates: &RateTable,
    owner_id: &str,
) -> LedgerResult<ConsistencyReport> {
    let accounts = ctx.accounts(owner_id).await?;
    let budgets = ctx.budgets(owner_id).await?;
    let txs = ctx.transactions(owner_id).await?;

    let mut expected_balance: HashMap<Uuid, i64> = accounts
        .iter()
        .map(|account| (account.id, account.opening_minor))
        .collect();
    let mut expected_spent: HashMap<Uuid, i64> =
        budgets.iter().map(|budget| (budget.id, 0)).collect();

    let accounts_by_id: HashMap<Uuid, &Account> =
        accounts.iter().map(|account| (account.id, account)).collect();
    let budgets_by_key: HashMap<(Uuid, &str), &Budget> = budgets
        .iter()
        .map(|budget| ((budget.category_id, budget.month.as_str()), budget))
        .collect();

    for tx in &txs {
        let Some(account) = accounts_by_id.get(&tx.account_id) else {
            // Orphaned row (its account was removed); it contributes to no
            // aggregate, same as the rollback paths treat it.
            continue;
        };
        let converted = rates.convert_minor(tx.amount_minor, tx.currency, account.currency);
        if let Some(slot) = expected_balance.get_mut(&account.id) {
            *slot += tx.kind.sign() * converted;
        }
        if tx.kind != TransactionKind::Expense {
            continue;
        }
        let Some(category_id) = tx.category_id else {
            continue;
        };
        let month = tx.month();
        if let Some(budget) = budgets_by_key.get(&(category_id, month.as_str())) {
            let accrued = rates.convert_minor(tx.amount_minor, tx.currency, budget.currency);
            if let Some(slot) = expected_spent.get_mut(&budget.id) {
                *slot += accrued;
            }
        }
    }

    let mut report = ConsistencyReport::default();
    for account in &accounts {
        let expected = expected_balance.get(&account.id).copied().unwrap_or(0);
        if expected != account.balance_minor {
            report.accounts.push(AccountDrift {
                account_id: account.id,
                stored_minor: account.balance_minor,
                expected_minor: expected,
            });
        }
    }
    for budget in &budgets {
        let expected = expected_spent.get(&budget.id).copied().unwrap_or(0);
        if expected != budget.spent_minor {
            report.budgets.push(BudgetDrift {
                budget_id: budget.id,
                category_id: budget.category_id,
                month: budget.month.clone(),
                stored_minor: budget.spent_minor,
                expected_minor: expected,
            });
        }
    }
    Ok(report)
}

impl<S: AtomicityStrategy> Ledger<S> {
    pub async fn transaction(&self, owner_id: &str, id: Uuid) -> LedgerResult<Transaction> {
        self.store
            .run_atomic(async |ctx| {
                ctx.transaction(owner_id, id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(format!("transaction {id}")))
            })
            .await
    }

    pub async fn transactions(&self, owner_id: &str) -> LedgerResult<Vec<Transaction>> {
        self.store
            .run_atomic(async |ctx| ctx.transactions(owner_id).await)
            .await
    }

    pub async fn account(&self, owner_id: &str, id: Uuid) -> LedgerResult<Account> {
        self.store
            .run_atomic(async |ctx| {
                ctx.account(owner_id, id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))
            })
            .await
    }

    pub async fn accounts(&self, owner_id: &str) -> LedgerResult<Vec<Account>> {
        self.store
            .run_atomic(async |ctx| ctx.accounts(owner_id).await)
            .await
    }

    /// The month budget for a category, when one exists.
    pub async fn budget(
        &self,
        owner_id: &str,
        category_id: Uuid,
        month: &str,
    ) -> LedgerResult<Option<Budget>> {
        self.store
            .run_atomic(async |ctx| ctx.budget(owner_id, category_id, month).await)
            .await
    }

    pub async fn budgets(&self, owner_id: &str) -> LedgerResult<Vec<Budget>> {
        self.store
            .run_atomic(async |ctx| ctx.budgets(owner_id).await)
            .await
    }

    /// Diffs stored balances and spent totals against a replay of the
    /// transaction log, without changing anything.
    pub async fn check_consistency(&self, owner_id: &str) -> LedgerResult<ConsistencyReport> {
        self.store
            .run_atomic(async |ctx| drift_report(ctx, &self.rates, owner_id).await)
            .await
    }

    /// Repairs drifted aggregates in one atomic unit and returns the drift
    /// that was found (empty report means nothing needed repair).
    pub async fn recompute_aggregates(&self, owner_id: &str) -> LedgerResult<ConsistencyReport> {
        self.store
            .run_atomic(async |ctx| {
                let report = drift_report(ctx, &self.rates, owner_id).await?;
                for drift in &report.accounts {
                    let delta = drift.expected_minor - drift.stored_minor;
                    tracing::info!(account_id = %drift.account_id, delta, "repairing balance");
                    ctx.adjust_balance(owner_id, drift.account_id, delta).await?;
                }
                for drift in &report.budgets {
                    let delta = drift.expected_minor - drift.stored_minor;
                    tracing::info!(budget_id = %drift.budget_id, delta, "repairing spent total");
                    ctx.adjust_spent(owner_id, drift.budget_id, delta).await?;
                }
                Ok(report)
            })
            .await
    }
}
