use uuid::Uuid;

use crate::{
    LedgerError, LedgerResult, Transaction, TransactionPatch,
    ops::{
        Ledger,
        transactions::{apply_effect, effect_of, invert_transaction},
        write::ensure_kind_allowed,
    },
    store::{AccountRepository, AtomicityStrategy, CategoryRepository, TransactionStore},
};

impl<S: AtomicityStrategy> Ledger<S> {
    /// Rewrites a transaction and re-derives the aggregates it touches.
    ///
    /// Indivisibly: the old row's effect is inverted, the row is updated,
    /// and the new effect is applied. A patch that changes nothing still
    /// goes through the full cycle and lands on the same aggregates.
    pub async fn update_transaction(
        &self,
        owner_id: &str,
        id: Uuid,
        patch: TransactionPatch,
    ) -> LedgerResult<Transaction> {
        self.store
            .run_atomic(async |ctx| {
                let existing = ctx.transaction(owner_id, id).await?.ok_or_else(|| {
                    LedgerError::NotFound(format!("transaction {id}"))
                })?;

                let mut updated = existing.clone();
                if let Some(account_id) = patch.account_id {
                    updated.account_id = account_id;
                }
                if let Some(category_id) = patch.category_id {
                    updated.category_id = category_id;
                }
                if let Some(kind) = patch.kind {
                    updated.kind = kind;
                }
                if let Some(amount_minor) = patch.amount_minor {
                    if amount_minor < 0 {
                        return Err(LedgerError::Validation(
                            "amount_minor must be >= 0".to_string(),
                        ));
                    }
                    updated.amount_minor = amount_minor;
                }
                if let Some(currency) = patch.currency {
                    updated.currency = currency;
                }
                if let Some(date) = patch.date {
                    updated.date = date;
                }
                if let Some(note) = &patch.note {
                    updated.note = note.clone();
                }

                let account = ctx
                    .account(owner_id, updated.account_id)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("account {}", updated.account_id))
                    })?;
                if let Some(category_id) = updated.category_id {
                    let category =
                        ctx.category(owner_id, category_id).await?.ok_or_else(|| {
                            LedgerError::NotFound(format!("category {category_id}"))
                        })?;
                    ensure_kind_allowed(&category, updated.kind)?;
                }

                invert_transaction(ctx, &self.rates, owner_id, &existing).await?;
                ctx.update_transaction(&updated).await?;
                let effect = effect_of(&updated, &account, &self.rates);
                apply_effect(ctx, &self.rates, owner_id, &effect).await?;

                tracing::debug!(tx_id = %updated.id, "transaction updated");
                Ok(updated)
            })
            .await
    }
}
