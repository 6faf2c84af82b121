//! Transfer primitives.
//!
//! A `Transfer` is cash paid out by a holding without changing the position,
//! dividends being the common case. Transfers feed the dividend side of the
//! return metrics and nothing else.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub amount: Option<f64>,
    pub notes: Option<String>,
    pub holding_id: Uuid,
    pub account_id: Uuid,
    pub owner_id: String,
}

impl Transfer {
    pub fn new(
        date: DateTime<Utc>,
        amount: Option<f64>,
        notes: Option<String>,
        holding_id: Uuid,
        account_id: Uuid,
        owner_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount,
            notes,
            holding_id,
            account_id,
            owner_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: DateTimeUtc,
    pub amount: Option<f64>,
    pub notes: Option<String>,
    pub holding_id: String,
    pub account_id: String,
    pub owner_id: String,
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
    #[sea_orm(
        belongs_to = "super::holding::Entity",
        from = "Column::HoldingId",
        to = "super::holding::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Holdings,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::holding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holdings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transfer> for ActiveModel {
    fn from(transfer: &Transfer) -> Self {
        Self {
            id: ActiveValue::Set(transfer.id.to_string()),
            date: ActiveValue::Set(transfer.date),
            amount: ActiveValue::Set(transfer.amount),
            notes: ActiveValue::Set(transfer.notes.clone()),
            holding_id: ActiveValue::Set(transfer.holding_id.to_string()),
            account_id: ActiveValue::Set(transfer.account_id.to_string()),
            owner_id: ActiveValue::Set(transfer.owner_id.to_string()),
        }
    }
}

impl TryFrom<Model> for Transfer {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| {
                LedgerError::InvalidRecord(format!("transfer id is not a uuid: {}", model.id))
            })?,
            date: model.date,
            amount: model.amount,
            notes: model.notes,
            holding_id: Uuid::parse_str(&model.holding_id).map_err(|_| {
                LedgerError::InvalidRecord(format!(
                    "transfer holding id is not a uuid: {}",
                    model.holding_id
                ))
            })?,
            account_id: Uuid::parse_str(&model.account_id).map_err(|_| {
                LedgerError::InvalidRecord(format!(
                    "transfer account id is not a uuid: {}",
                    model.account_id
                ))
            })?,
            owner_id: model.owner_id,
        })
    }
}
