//! The reactive object store.
//!
//! `LedgerStore` keeps the committed records in memory and persists every
//! write through a single database transaction. Writes are serialized by one
//! writer lock; reads are snapshots of committed state; registered live
//! queries are re-published synchronously after each commit, before the
//! write call returns, so a read issued after a write always observes it.

use sea_orm::{
    DatabaseConnection, DatabaseTransaction, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::error::stale;
use crate::txn::{Change, WriteTxn};
use crate::{
    Account, AccountMetrics, Holding, HoldingMetrics, LedgerError, LiveQuery, ResultLedger,
    Transaction, Transfer, account, holding, transaction, transfer,
};

/// The committed records: account aggregates in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) accounts: Vec<Account>,
}

impl StoreState {
    pub(crate) fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub(crate) fn account_mut(&mut self, id: Uuid) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|account| account.id == id)
    }

    pub(crate) fn find_holding(&self, id: Uuid) -> Option<&Holding> {
        self.accounts.iter().find_map(|account| account.holding(id))
    }

    pub(crate) fn holding_mut(&mut self, id: Uuid) -> Option<&mut Holding> {
        self.accounts
            .iter_mut()
            .find_map(|account| account.holdings.iter_mut().find(|h| h.id == id))
    }

    pub(crate) fn find_transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.accounts
            .iter()
            .find_map(|account| account.transaction(id))
    }

    pub(crate) fn transaction_mut(&mut self, id: Uuid) -> Option<&mut Transaction> {
        self.accounts
            .iter_mut()
            .find_map(|account| account.transactions.iter_mut().find(|tx| tx.id == id))
    }

    pub(crate) fn find_transfer(&self, id: Uuid) -> Option<&Transfer> {
        self.accounts
            .iter()
            .find_map(|account| account.transfer(id))
    }

    pub(crate) fn transfer_mut(&mut self, id: Uuid) -> Option<&mut Transfer> {
        self.accounts
            .iter_mut()
            .find_map(|account| account.transfers.iter_mut().find(|t| t.id == id))
    }

    pub(crate) fn remove_holding(&mut self, id: Uuid) -> Option<Holding> {
        self.accounts
            .iter_mut()
            .find_map(|account| account.remove_holding(id))
    }

    pub(crate) fn remove_transaction(&mut self, id: Uuid) -> Option<Transaction> {
        self.accounts
            .iter_mut()
            .find_map(|account| account.remove_transaction(id))
    }

    pub(crate) fn remove_transfer(&mut self, id: Uuid) -> Option<Transfer> {
        self.accounts
            .iter_mut()
            .find_map(|account| account.remove_transfer(id))
    }

    fn transactions_for_holding(&self, holding_id: Uuid) -> Vec<Transaction> {
        self.accounts
            .iter()
            .flat_map(|account| account.transactions_for(holding_id))
            .cloned()
            .collect()
    }

    fn transfers_for_holding(&self, holding_id: Uuid) -> Vec<Transfer> {
        self.accounts
            .iter()
            .flat_map(|account| account.transfers_for(holding_id))
            .cloned()
            .collect()
    }
}

/// A registered live query: re-evaluates against the committed state and
/// reports whether anyone is still listening.
type Publisher = Box<dyn FnMut(&StoreState) -> bool + Send>;

pub struct LedgerStore {
    state: RwLock<StoreState>,
    writer: Mutex<()>,
    publishers: Mutex<Vec<Publisher>>,
    database: DatabaseConnection,
}

impl LedgerStore {
    /// Return a builder for `LedgerStore`.
    pub fn builder() -> LedgerStoreBuilder {
        LedgerStoreBuilder::default()
    }

    /// Run one atomic write transaction.
    ///
    /// The body gets exclusive mutable access to a draft of the committed
    /// state and runs synchronously, without yielding. On success the staged
    /// changes are persisted in one database transaction, the draft becomes
    /// the committed state, and every registered live query is re-published
    /// before this call returns. A failing body applies nothing and comes
    /// back wrapped as [`TransactionAborted`]; a database failure during
    /// commit rolls back and surfaces as [`Database`].
    ///
    /// [`TransactionAborted`]: LedgerError::TransactionAborted
    /// [`Database`]: LedgerError::Database
    pub async fn write<T, F>(&self, body: F) -> ResultLedger<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> ResultLedger<T>,
    {
        let _writer = self.writer.lock().await;
        let mut draft = { self.state.read().await.clone() };
        let mut journal = Vec::new();
        let value = {
            let mut txn = WriteTxn::new(&mut draft, &mut journal);
            match body(&mut txn) {
                Ok(value) => value,
                Err(cause) => return Err(LedgerError::aborted(cause)),
            }
        };

        if !journal.is_empty() {
            let db_tx = self.database.begin().await?;
            for change in &journal {
                replay(change, &db_tx).await?;
            }
            db_tx.commit().await?;
        }

        *self.state.write().await = draft;
        self.publish().await;
        tracing::debug!(changes = journal.len(), "write transaction committed");
        Ok(value)
    }

    /// Every account, in insertion order.
    pub async fn accounts(&self) -> Vec<Account> {
        self.state.read().await.accounts.clone()
    }

    /// The owner's accounts, in insertion order.
    pub async fn accounts_for(&self, owner_id: &str) -> Vec<Account> {
        self.state
            .read()
            .await
            .accounts
            .iter()
            .filter(|account| account.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Snapshot of one account; stale once it has been deleted.
    pub async fn account(&self, id: Uuid) -> ResultLedger<Account> {
        self.state
            .read()
            .await
            .account(id)
            .cloned()
            .ok_or_else(|| stale("account", id))
    }

    pub async fn holding(&self, id: Uuid) -> ResultLedger<Holding> {
        self.state
            .read()
            .await
            .find_holding(id)
            .cloned()
            .ok_or_else(|| stale("holding", id))
    }

    pub async fn transaction(&self, id: Uuid) -> ResultLedger<Transaction> {
        self.state
            .read()
            .await
            .find_transaction(id)
            .cloned()
            .ok_or_else(|| stale("transaction", id))
    }

    pub async fn transfer(&self, id: Uuid) -> ResultLedger<Transfer> {
        self.state
            .read()
            .await
            .find_transfer(id)
            .cloned()
            .ok_or_else(|| stale("transfer", id))
    }

    /// Current valuation of one holding.
    pub async fn holding_metrics(&self, holding_id: Uuid) -> ResultLedger<HoldingMetrics> {
        let state = self.state.read().await;
        let holding = state
            .find_holding(holding_id)
            .ok_or_else(|| stale("holding", holding_id))?;
        let account = state
            .account(holding.account_id)
            .ok_or_else(|| stale("account", holding.account_id))?;
        Ok(HoldingMetrics::for_holding(account, holding_id))
    }

    /// Current rollup of one account.
    pub async fn account_metrics(&self, account_id: Uuid) -> ResultLedger<AccountMetrics> {
        let state = self.state.read().await;
        let account = state
            .account(account_id)
            .ok_or_else(|| stale("account", account_id))?;
        Ok(AccountMetrics::compute(account))
    }

    /// Live view of the owner's accounts.
    pub async fn watch_accounts(&self, owner_id: &str) -> LiveQuery<Vec<Account>> {
        let owner_id = owner_id.to_string();
        self.register(move |state| {
            state
                .accounts
                .iter()
                .filter(|account| account.owner_id == owner_id)
                .cloned()
                .collect()
        })
        .await
    }

    /// Live view of an account's holdings; empties once the account is gone.
    pub async fn watch_holdings(&self, account_id: Uuid) -> LiveQuery<Vec<Holding>> {
        self.register(move |state| {
            state
                .account(account_id)
                .map(|account| account.holdings.clone())
                .unwrap_or_default()
        })
        .await
    }

    /// Live view of a holding's transactions.
    pub async fn watch_transactions(&self, holding_id: Uuid) -> LiveQuery<Vec<Transaction>> {
        self.register(move |state| state.transactions_for_holding(holding_id))
            .await
    }

    /// Live view of a holding's transfers.
    pub async fn watch_transfers(&self, holding_id: Uuid) -> LiveQuery<Vec<Transfer>> {
        self.register(move |state| state.transfers_for_holding(holding_id))
            .await
    }

    /// Live valuation of a holding; `None` once it is deleted, never a
    /// silently zeroed figure.
    pub async fn watch_holding_metrics(
        &self,
        holding_id: Uuid,
    ) -> LiveQuery<Option<HoldingMetrics>> {
        self.register(move |state| {
            let holding = state.find_holding(holding_id)?;
            let account = state.account(holding.account_id)?;
            Some(HoldingMetrics::for_holding(account, holding_id))
        })
        .await
    }

    /// Live rollup of an account; `None` once it is deleted.
    pub async fn watch_account_metrics(
        &self,
        account_id: Uuid,
    ) -> LiveQuery<Option<AccountMetrics>> {
        self.register(move |state| state.account(account_id).map(AccountMetrics::compute))
            .await
    }

    /// Register a selector as a live query, seeded from committed state.
    ///
    /// Seeding and registration share one critical section, with the locks
    /// taken in the same order `publish` takes them, so no commit can land
    /// between the seed and the publisher joining the list.
    async fn register<V, F>(&self, select: F) -> LiveQuery<V>
    where
        V: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&StoreState) -> V + Send + 'static,
    {
        let state = self.state.read().await;
        let mut publishers = self.publishers.lock().await;
        let (tx, rx) = watch::channel(select(&state));
        publishers.push(Box::new(move |state| {
            if tx.is_closed() {
                return false;
            }
            let next = select(state);
            tx.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
            true
        }));
        LiveQuery::new(rx)
    }

    /// Re-evaluate every registered query against the committed state,
    /// pruning the ones nobody listens to anymore.
    async fn publish(&self) {
        let state = self.state.read().await;
        let mut publishers = self.publishers.lock().await;
        publishers.retain_mut(|publisher| publisher(&state));
    }
}

async fn replay(change: &Change, db_tx: &DatabaseTransaction) -> ResultLedger<()> {
    match change {
        Change::InsertAccount(record) => {
            account::ActiveModel::from(record).insert(db_tx).await?;
        }
        Change::UpdateAccount(record) => {
            account::ActiveModel::from(record).update(db_tx).await?;
        }
        Change::DeleteAccountCascade(id) => {
            let id = id.to_string();
            transfer::Entity::delete_many()
                .filter(transfer::Column::AccountId.eq(id.clone()))
                .exec(db_tx)
                .await?;
            transaction::Entity::delete_many()
                .filter(transaction::Column::AccountId.eq(id.clone()))
                .exec(db_tx)
                .await?;
            holding::Entity::delete_many()
                .filter(holding::Column::AccountId.eq(id.clone()))
                .exec(db_tx)
                .await?;
            account::Entity::delete_by_id(id).exec(db_tx).await?;
        }
        Change::InsertHolding(record) => {
            holding::ActiveModel::from(record).insert(db_tx).await?;
        }
        Change::UpdateHolding(record) => {
            holding::ActiveModel::from(record).update(db_tx).await?;
        }
        Change::DeleteHolding(id) => {
            holding::Entity::delete_by_id(id.to_string())
                .exec(db_tx)
                .await?;
        }
        Change::InsertTransaction(record) => {
            transaction::ActiveModel::from(record).insert(db_tx).await?;
        }
        Change::UpdateTransaction(record) => {
            transaction::ActiveModel::from(record).update(db_tx).await?;
        }
        Change::DeleteTransaction(id) => {
            transaction::Entity::delete_by_id(id.to_string())
                .exec(db_tx)
                .await?;
        }
        Change::InsertTransfer(record) => {
            transfer::ActiveModel::from(record).insert(db_tx).await?;
        }
        Change::UpdateTransfer(record) => {
            transfer::ActiveModel::from(record).update(db_tx).await?;
        }
        Change::DeleteTransfer(id) => {
            transfer::Entity::delete_by_id(id.to_string())
                .exec(db_tx)
                .await?;
        }
    }
    Ok(())
}

/// The builder for `LedgerStore`.
#[derive(Default)]
pub struct LedgerStoreBuilder {
    database: DatabaseConnection,
}

impl LedgerStoreBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> LedgerStoreBuilder {
        self.database = db;
        self
    }

    /// Load every persisted record and construct the store around it.
    ///
    /// Rows load in rowid order, which is insertion order; duplicate-name
    /// resolution and the last-price tie-break both depend on it.
    ///
    /// Children whose account has not been replicated yet are skipped with a
    /// warning; they become visible once their account row arrives.
    pub async fn build(self) -> ResultLedger<LedgerStore> {
        let account_models = account::Entity::find()
            .order_by_asc(Expr::cust("rowid"))
            .all(&self.database)
            .await?;
        let mut accounts = Vec::with_capacity(account_models.len());
        for model in account_models {
            accounts.push(Account::try_from(model)?);
        }

        let holding_models = holding::Entity::find()
            .order_by_asc(Expr::cust("rowid"))
            .all(&self.database)
            .await?;
        for model in holding_models {
            let record = Holding::try_from(model)?;
            match accounts.iter_mut().find(|a| a.id == record.account_id) {
                Some(account) => account.holdings.push(record),
                None => tracing::warn!(holding = %record.id, "holding has no replicated account yet"),
            }
        }

        let transaction_models = transaction::Entity::find()
            .order_by_asc(Expr::cust("rowid"))
            .all(&self.database)
            .await?;
        for model in transaction_models {
            let record = Transaction::try_from(model)?;
            match accounts.iter_mut().find(|a| a.id == record.account_id) {
                Some(account) => account.transactions.push(record),
                None => {
                    tracing::warn!(transaction = %record.id, "transaction has no replicated account yet")
                }
            }
        }

        let transfer_models = transfer::Entity::find()
            .order_by_asc(Expr::cust("rowid"))
            .all(&self.database)
            .await?;
        for model in transfer_models {
            let record = Transfer::try_from(model)?;
            match accounts.iter_mut().find(|a| a.id == record.account_id) {
                Some(account) => account.transfers.push(record),
                None => tracing::warn!(transfer = %record.id, "transfer has no replicated account yet"),
            }
        }

        tracing::info!(accounts = accounts.len(), "ledger state loaded");
        Ok(LedgerStore {
            state: RwLock::new(StoreState { accounts }),
            writer: Mutex::new(()),
            publishers: Mutex::new(Vec::new()),
            database: self.database,
        })
    }
}
