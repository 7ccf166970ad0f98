use crate::{
    LedgerError, LedgerResult, Transaction, TransactionDraft,
    ops::{
        Ledger,
        transactions::{apply_effect, effect_of},
        write::ensure_kind_allowed,
    },
    store::{AccountRepository, AtomicityStrategy, CategoryRepository, TransactionStore},
};

impl<S: AtomicityStrategy> Ledger<S> {
    /// Records a new transaction and applies its effect: the account
    /// balance moves by the signed, converted amount, and a categorized
    /// expense accrues into the month budget (auto-created with a zero
    /// limit on first use).
    pub async fn create_transaction(
        &self,
        owner_id: &str,
        draft: TransactionDraft,
    ) -> LedgerResult<Transaction> {
        self.store
            .run_atomic(async |ctx| {
                let tx = Transaction::new(
                    owner_id.to_string(),
                    draft.account_id,
                    draft.category_id,
                    draft.kind,
                    draft.amount_minor,
                    draft.currency,
                    draft.date,
                    draft.note.clone().unwrap_or_default(),
                )?;

                let account = ctx
                    .account(owner_id, draft.account_id)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("account {}", draft.account_id))
                    })?;
                if let Some(category_id) = draft.category_id {
                    let category =
                        ctx.category(owner_id, category_id).await?.ok_or_else(|| {
                            LedgerError::NotFound(format!("category {category_id}"))
                        })?;
                    ensure_kind_allowed(&category, draft.kind)?;
                }

                ctx.insert_transaction(&tx).await?;
                let effect = effect_of(&tx, &account, &self.rates);
                apply_effect(ctx, &self.rates, owner_id, &effect).await?;

                tracing::debug!(
                    tx_id = %tx.id,
                    account_id = %tx.account_id,
                    kind = tx.kind.as_str(),
                    amount_minor = tx.amount_minor,
                    "transaction created"
                );
                Ok(tx)
            })
            .await
    }
}
