//! Write operations: create, update, delete.
//!
//! Each runs as one atomic unit of work and resolves every referenced
//! entity before the first mutation, so the serialized backend (which has
//! no rollback) never observes a half-applied operation.

use crate::{
    Category, CategoryKind, LedgerError, LedgerResult, TransactionKind,
};

mod create;
mod delete;
mod update;

/// A categorized transaction must match the category's direction: expenses
/// go to expense categories, income to income categories.
fn ensure_kind_allowed(category: &Category, kind: TransactionKind) -> LedgerResult<()> {
    let matches = match kind {
        TransactionKind::Income => category.kind == CategoryKind::Income,
        TransactionKind::Expense => category.kind == CategoryKind::Expense,
    };
    if matches {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "category {} is a {} category, transaction is {}",
            category.id,
            category.kind.as_str(),
            kind.as_str(),
        )))
    }
}
