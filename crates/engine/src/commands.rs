//! Command structs for engine operations.
//!
//! These types group parameters for the write operations (create/update),
//! keeping call sites readable and avoiding long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Currency, transactions::TransactionKind};

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct TransactionDraft {
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl TransactionDraft {
    #[must_use]
    pub fn new(
        account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        date: NaiveDate,
    ) -> Self {
        Self {
            account_id,
            category_id: None,
            kind,
            amount_minor,
            currency,
            date,
            note: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Update an existing transaction.
///
/// Every field is optional; fields left as `None` keep the stored value.
/// The category is tri-state: absent (keep), set to a new id, or cleared.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub account_id: Option<Uuid>,
    pub category_id: Option<Option<Uuid>>,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

impl TransactionPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(Some(category_id));
        self
    }

    #[must_use]
    pub fn clear_category(mut self) -> Self {
        self.category_id = Some(None);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// True when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none()
            && self.category_id.is_none()
            && self.kind.is_none()
            && self.amount_minor.is_none()
            && self.currency.is_none()
            && self.date.is_none()
            && self.note.is_none()
    }
}
