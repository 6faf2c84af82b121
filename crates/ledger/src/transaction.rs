//! Transaction primitives.
//!
//! A `Transaction` is a dated trade against a holding: a buy when `amount`
//! is positive, a sell when it is negative.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identifier, generated client-side at creation time.
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// Unit price. Absent for events that carry no market price.
    pub price: Option<f64>,
    /// Signed quantity: positive for buys, negative for sells.
    pub amount: Option<f64>,
    /// Cash actually moved. Independent of `price * amount`; fees and
    /// rounding live in the difference.
    pub total: Option<f64>,
    pub notes: Option<String>,
    pub holding_id: Uuid,
    pub account_id: Uuid,
    pub owner_id: String,
}

impl Transaction {
    pub fn new(
        date: DateTime<Utc>,
        price: Option<f64>,
        amount: Option<f64>,
        total: Option<f64>,
        notes: Option<String>,
        holding_id: Uuid,
        account_id: Uuid,
        owner_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            price,
            amount,
            total,
            notes,
            holding_id,
            account_id,
            owner_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: DateTimeUtc,
    pub price: Option<f64>,
    pub amount: Option<f64>,
    pub total: Option<f64>,
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

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            date: ActiveValue::Set(tx.date),
            price: ActiveValue::Set(tx.price),
            amount: ActiveValue::Set(tx.amount),
            total: ActiveValue::Set(tx.total),
            notes: ActiveValue::Set(tx.notes.clone()),
            holding_id: ActiveValue::Set(tx.holding_id.to_string()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            owner_id: ActiveValue::Set(tx.owner_id.to_string()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| {
                LedgerError::InvalidRecord(format!("transaction id is not a uuid: {}", model.id))
            })?,
            date: model.date,
            price: model.price,
            amount: model.amount,
            total: model.total,
            notes: model.notes,
            holding_id: Uuid::parse_str(&model.holding_id).map_err(|_| {
                LedgerError::InvalidRecord(format!(
                    "transaction holding id is not a uuid: {}",
                    model.holding_id
                ))
            })?,
            account_id: Uuid::parse_str(&model.account_id).map_err(|_| {
                LedgerError::InvalidRecord(format!(
                    "transaction account id is not a uuid: {}",
                    model.account_id
                ))
            })?,
            owner_id: model.owner_id,
        })
    }
}
