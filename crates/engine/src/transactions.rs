//! Transaction primitives.
//!
//! A `Transaction` is the source-of-truth row behind both derived
//! aggregates: its signed, converted amount flows into the account balance,
//! and (for categorized expenses) into the monthly budget's `spent` total.

use chrono::{Datelike, NaiveDate};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, LedgerResult, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Sign applied to the converted amount when adjusting a balance.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Income => 1,
            Self::Expense => -1,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Calendar month bucket of a date, formatted `YYYY-MM`.
#[must_use]
pub fn year_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: String,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub date: NaiveDate,
    pub note: String,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: String,
        account_id: Uuid,
        category_id: Option<Uuid>,
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        date: NaiveDate,
        note: String,
    ) -> LedgerResult<Self> {
        if amount_minor < 0 {
            return Err(LedgerError::Validation(
                "amount_minor must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            account_id,
            category_id,
            kind,
            amount_minor,
            currency,
            date,
            note,
        })
    }

    /// Month bucket this transaction accrues into.
    #[must_use]
    pub fn month(&self) -> String {
        year_month(self.date)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub account_id: String,
    pub category_id: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub date: Date,
    pub note: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            owner_id: ActiveValue::Set(tx.owner_id.clone()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            date: ActiveValue::Set(tx.date),
            note: ActiveValue::Set(tx.note.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let category_id = match model.category_id {
            Some(raw) => Some(parse_uuid(&raw, "category")?),
            None => None,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            owner_id: model.owner_id,
            account_id: parse_uuid(&model.account_id, "account")?,
            category_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            date: model.date,
            note: model.note,
        })
    }
}
