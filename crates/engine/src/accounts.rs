//! The module contains the `Account` struct and its storage model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, util::parse_uuid};

/// A money account (cash, bank account, card).
///
/// `balance_minor` is denormalized: it must always equal `opening_minor`
/// plus the sum of the signed, converted amounts of every stored transaction
/// referencing the account. It is only ever written through the store's
/// adjust-balance operation, inside an atomic unit of work.
/// `opening_minor` is fixed at creation and is the baseline consistency
/// checks recompute from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, generated once and persisted.
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub currency: Currency,
    pub opening_minor: i64,
    pub balance_minor: i64,
}

impl Account {
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
        balance_minor: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            currency,
            opening_minor: balance_minor,
            balance_minor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub currency: String,
    pub opening_minor: i64,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            owner_id: ActiveValue::Set(account.owner_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            opening_minor: ActiveValue::Set(account.opening_minor),
            balance_minor: ActiveValue::Set(account.balance_minor),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            owner_id: model.owner_id,
            name: model.name,
            currency: Currency::try_from(model.currency.as_str())?,
            opening_minor: model.opening_minor,
            balance_minor: model.balance_minor,
        })
    }
}
