//! The module contains the `Holding` record and its entity.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

/// A named financial instrument tracked within an account.
///
/// The name is the resolution key when a transaction refers to its holding
/// by string instead of by id. `account_id` is a back-reference for lookups,
/// not an ownership edge; the account's own collection is what owns the
/// holding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub name: String,
    pub owner_id: String,
    pub account_id: Uuid,
    pub notes: Option<String>,
}

impl Holding {
    pub fn new(name: String, owner_id: String, account_id: Uuid, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            owner_id,
            account_id,
            notes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "holdings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub account_id: String,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::transfer::Entity")]
    Transfers,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transfers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Holding> for ActiveModel {
    fn from(holding: &Holding) -> Self {
        Self {
            id: ActiveValue::Set(holding.id.to_string()),
            name: ActiveValue::Set(holding.name.clone()),
            owner_id: ActiveValue::Set(holding.owner_id.clone()),
            account_id: ActiveValue::Set(holding.account_id.to_string()),
            notes: ActiveValue::Set(holding.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Holding {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| {
                LedgerError::InvalidRecord(format!("holding id is not a uuid: {}", model.id))
            })?,
            name: model.name,
            owner_id: model.owner_id,
            account_id: Uuid::parse_str(&model.account_id).map_err(|_| {
                LedgerError::InvalidRecord(format!(
                    "holding account id is not a uuid: {}",
                    model.account_id
                ))
            })?,
            notes: model.notes,
        })
    }
}
