//! Category registry.
//!
//! Categories are created by flows outside the engine; the engine only
//! reads them to decide whether a transaction accrues into a budget
//! (only `expense` categories accrue) and to reject kind mismatches.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::Validation(format!(
                "invalid category kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub kind: CategoryKind,
}

impl Category {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(category: &Category) -> Self {
        Self {
            id: ActiveValue::Set(category.id.to_string()),
            owner_id: ActiveValue::Set(category.owner_id.clone()),
            name: ActiveValue::Set(category.name.clone()),
            kind: ActiveValue::Set(category.kind.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "category")?,
            owner_id: model.owner_id,
            name: model.name,
            kind: CategoryKind::try_from(model.kind.as_str())?,
        })
    }
}
