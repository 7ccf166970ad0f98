use uuid::Uuid;

use crate::{
    LedgerError, LedgerResult,
    ops::{Ledger, transactions::invert_transaction},
    store::{AtomicityStrategy, TransactionStore},
};

impl<S: AtomicityStrategy> Ledger<S> {
    /// Removes a transaction and inverts its effect, restoring the account
    /// balance and the budget's spent total to what they were before the
    /// transaction existed.
    pub async fn delete_transaction(&self, owner_id: &str, id: Uuid) -> LedgerResult<()> {
        self.store
            .run_atomic(async |ctx| {
                let existing = ctx.transaction(owner_id, id).await?.ok_or_else(|| {
                    LedgerError::NotFound(format!("transaction {id}"))
                })?;

                invert_transaction(ctx, &self.rates, owner_id, &existing).await?;
                ctx.delete_transaction(owner_id, id).await?;

                tracing::debug!(tx_id = %id, "transaction deleted");
                Ok(())
            })
            .await
    }
}
