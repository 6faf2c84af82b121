//! The module contains the `Account` aggregate and its entity.
//!
//! An account is the ownership root: it holds its holdings, transactions and
//! transfers as insertion-ordered collections, and deletion cascades from
//! here. The children's `account_id`/`holding_id` fields are lookup keys
//! only, never lifetime edges.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Holding, LedgerError, ResultLedger, Transaction, Transfer};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub notes: Option<String>,
    pub holdings: Vec<Holding>,
    pub transactions: Vec<Transaction>,
    pub transfers: Vec<Transfer>,
}

impl Account {
    pub fn new(owner_id: String, name: String, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            notes,
            holdings: Vec::new(),
            transactions: Vec::new(),
            transfers: Vec::new(),
        }
    }

    pub fn holding(&self, id: Uuid) -> Option<&Holding> {
        self.holdings.iter().find(|holding| holding.id == id)
    }

    /// First holding with this exact name, in insertion order.
    ///
    /// Duplicate names are tolerated; the first inserted one wins, always.
    pub fn holding_by_name(&self, name: &str) -> Option<&Holding> {
        self.holdings.iter().find(|holding| holding.name == name)
    }

    /// Name lookup that refuses to guess: `Ok(None)` when absent, an
    /// [`AmbiguousHolding`] error when the name matches more than once.
    ///
    /// [`AmbiguousHolding`]: LedgerError::AmbiguousHolding
    pub fn unique_holding_by_name(&self, name: &str) -> ResultLedger<Option<&Holding>> {
        let mut matches = self.holdings.iter().filter(|holding| holding.name == name);
        match (matches.next(), matches.next()) {
            (Some(_), Some(_)) => Err(LedgerError::AmbiguousHolding(name.to_string())),
            (first, _) => Ok(first),
        }
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    pub fn transfer(&self, id: Uuid) -> Option<&Transfer> {
        self.transfers.iter().find(|transfer| transfer.id == id)
    }

    /// The holding's transactions, in insertion order.
    pub fn transactions_for(&self, holding_id: Uuid) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |tx| tx.holding_id == holding_id)
    }

    /// The holding's transfers (dividends), in insertion order.
    pub fn transfers_for(&self, holding_id: Uuid) -> impl Iterator<Item = &Transfer> {
        self.transfers
            .iter()
            .filter(move |transfer| transfer.holding_id == holding_id)
    }

    /// Detach a holding. Its transactions and transfers stay behind as
    /// orphans; aggregation skips them because their holding no longer
    /// exists.
    pub(crate) fn remove_holding(&mut self, id: Uuid) -> Option<Holding> {
        let index = self.holdings.iter().position(|holding| holding.id == id)?;
        Some(self.holdings.remove(index))
    }

    pub(crate) fn remove_transaction(&mut self, id: Uuid) -> Option<Transaction> {
        let index = self.transactions.iter().position(|tx| tx.id == id)?;
        Some(self.transactions.remove(index))
    }

    pub(crate) fn remove_transfer(&mut self, id: Uuid) -> Option<Transfer> {
        let index = self
            .transfers
            .iter()
            .position(|transfer| transfer.id == id)?;
        Some(self.transfers.remove(index))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::holding::Entity")]
    Holdings,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::transfer::Entity")]
    Transfers,
}

impl Related<super::holding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holdings.def()
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

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            owner_id: ActiveValue::Set(account.owner_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            notes: ActiveValue::Set(account.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| {
                LedgerError::InvalidRecord(format!("account id is not a uuid: {}", model.id))
            })?,
            owner_id: model.owner_id,
            name: model.name,
            notes: model.notes,
            holdings: Vec::new(),
            transactions: Vec::new(),
            transfers: Vec::new(),
        })
    }
}
