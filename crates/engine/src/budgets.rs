//! Monthly budgets.
//!
//! One budget row exists per (owner, category, month). `spent_minor` is an
//! accrual total maintained by the engine: categorized expenses add their
//! converted amount, rollbacks subtract it again. The total is clamped at
//! zero so rounding on rollback can never leave it negative.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    #[default]
    Fixed,
    Percent,
}

impl BudgetMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Percent => "percent",
        }
    }
}

impl TryFrom<&str> for BudgetMode {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "fixed" => Ok(Self::Fixed),
            "percent" => Ok(Self::Percent),
            other => Err(LedgerError::Validation(format!(
                "invalid budget mode: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub owner_id: String,
    pub category_id: Uuid,
    /// Calendar month bucket, `YYYY-MM`.
    pub month: String,
    pub limit_minor: i64,
    pub spent_minor: i64,
    pub currency: Currency,
    pub mode: BudgetMode,
    pub percent: Option<i32>,
}

impl Budget {
    /// Budget row auto-created on the first qualifying expense of a month.
    ///
    /// The limit starts at zero; the owner raises it later through the
    /// budget CRUD flows, which are outside this engine.
    pub fn auto_created(
        owner_id: impl Into<String>,
        category_id: Uuid,
        month: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            category_id,
            month: month.into(),
            limit_minor: 0,
            spent_minor: 0,
            currency,
            mode: BudgetMode::Fixed,
            percent: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub category_id: String,
    pub month: String,
    pub limit_minor: i64,
    pub spent_minor: i64,
    pub currency: String,
    pub mode: String,
    pub percent: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id.to_string()),
            owner_id: ActiveValue::Set(budget.owner_id.clone()),
            category_id: ActiveValue::Set(budget.category_id.to_string()),
            month: ActiveValue::Set(budget.month.clone()),
            limit_minor: ActiveValue::Set(budget.limit_minor),
            spent_minor: ActiveValue::Set(budget.spent_minor),
            currency: ActiveValue::Set(budget.currency.code().to_string()),
            mode: ActiveValue::Set(budget.mode.as_str().to_string()),
            percent: ActiveValue::Set(budget.percent),
        }
    }
}

impl TryFrom<Model> for Budget {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            owner_id: model.owner_id,
            category_id: parse_uuid(&model.category_id, "category")?,
            month: model.month,
            limit_minor: model.limit_minor,
            spent_minor: model.spent_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            mode: BudgetMode::try_from(model.mode.as_str())?,
            percent: model.percent,
        })
    }
}
