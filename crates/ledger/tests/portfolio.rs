use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use sea_orm::Database;

use ledger::{
    AutoAccept, ConfirmationRequest, Confirmations, DecisionSender, HoldingRef, LedgerError,
    LedgerStore, NavigationRequest, Navigator, NullNavigator, Portfolio, TransactionDraft,
};
use migration::MigratorTrait;

async fn store() -> Arc<LedgerStore> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Arc::new(LedgerStore::builder().database(db).build().await.unwrap())
}

async fn portfolio() -> (Portfolio, Arc<LedgerStore>) {
    let store = store().await;
    let portfolio = Portfolio::new(store.clone(), Arc::new(AutoAccept), Arc::new(NullNavigator));
    (portfolio, store)
}

/// Declines everything by dropping the decision handle.
struct Dismiss;

impl Confirmations for Dismiss {
    fn present(&self, _request: ConfirmationRequest, decision: DecisionSender) {
        decision.dismiss();
    }
}

#[derive(Default)]
struct RecordingNavigator(Mutex<Vec<NavigationRequest>>);

impl Navigator for RecordingNavigator {
    fn request(&self, request: NavigationRequest) {
        self.0.lock().unwrap().push(request);
    }
}

fn draft(name: &str, price: f64, amount: f64, total: f64, secs: i64) -> TransactionDraft {
    TransactionDraft {
        date: Some(Utc.timestamp_opt(secs, 0).unwrap()),
        holding: HoldingRef::Name(name.to_string()),
        price: Some(price),
        amount: Some(amount),
        total: Some(total),
        notes: None,
    }
}

#[tokio::test]
async fn transaction_by_name_creates_the_holding_with_it() {
    let (portfolio, store) = portfolio().await;
    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();

    let tx = portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap();

    let account = store.account(account.id).await.unwrap();
    assert_eq!(account.holdings.len(), 1);
    assert_eq!(account.holdings[0].name, "VWCE");
    assert_eq!(tx.holding_id, account.holdings[0].id);
    assert_eq!(tx.owner_id, "alice");
}

#[tokio::test]
async fn repeated_names_reuse_the_holding() {
    let (portfolio, store) = portfolio().await;
    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();

    let buy = portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap();
    let sell = portfolio
        .add_transaction(account.id, draft("VWCE", 120.0, -5.0, -600.0, 2_000))
        .await
        .unwrap();

    assert_eq!(buy.holding_id, sell.holding_id);
    let account = store.account(account.id).await.unwrap();
    assert_eq!(account.holdings.len(), 1);
    assert_eq!(account.transactions.len(), 2);

    let metrics = store.holding_metrics(buy.holding_id).await.unwrap();
    assert_eq!(metrics.amount, 5.0);
    assert_eq!(metrics.average_price, 80.0);
    assert_eq!(metrics.return_percentage, 50.0);
}

#[tokio::test]
async fn transfers_feed_the_dividend_sum() {
    let (portfolio, store) = portfolio().await;
    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();
    let tx = portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap();

    portfolio
        .add_transfer(tx.holding_id, None, Some(50.0), None)
        .await
        .unwrap();

    let metrics = store.holding_metrics(tx.holding_id).await.unwrap();
    assert_eq!(metrics.dividend_sum, 50.0);
    // return_value = value + dividend_sum - total
    assert_eq!(metrics.return_value, 1_000.0 + 50.0 - 1_000.0);
}

#[tokio::test]
async fn editing_keeps_the_holding_reference() {
    let (portfolio, store) = portfolio().await;
    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();
    let tx = portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap();

    let saved = portfolio
        .save_transaction(tx.id, tx.date, Some(101.0), tx.amount, Some(1_010.0), None)
        .await
        .unwrap();

    assert_eq!(saved.holding_id, tx.holding_id);
    assert_eq!(saved.price, Some(101.0));
    let account = store.account(account.id).await.unwrap();
    assert_eq!(account.holdings.len(), 1);
}

#[tokio::test]
async fn declined_creation_stays_pending_and_writes_nothing() {
    let store = store().await;
    let portfolio = Portfolio::new(store.clone(), Arc::new(Dismiss), Arc::new(NullNavigator));

    let before = store.accounts().await;
    let pending = portfolio.add_account("alice", "Broker", None);
    let outcome = tokio::time::timeout(Duration::from_millis(50), pending).await;

    assert!(outcome.is_err());
    assert_eq!(store.accounts().await, before);
}

#[tokio::test]
async fn declined_update_leaves_the_account_untouched() {
    let store = store().await;
    let accepting = Portfolio::new(store.clone(), Arc::new(AutoAccept), Arc::new(NullNavigator));
    let account = accepting.add_account("alice", "Broker", None).await.unwrap();

    let declining = Portfolio::new(store.clone(), Arc::new(Dismiss), Arc::new(NullNavigator));
    let before = store.accounts().await;
    let pending = declining.save_account(account.id, "Renamed", None);
    let outcome = tokio::time::timeout(Duration::from_millis(50), pending).await;

    assert!(outcome.is_err());
    assert_eq!(store.accounts().await, before);
    assert_eq!(store.account(account.id).await.unwrap().name, "Broker");
}

#[tokio::test]
async fn removing_an_account_navigates_to_the_list() {
    let store = store().await;
    let navigator = Arc::new(RecordingNavigator::default());
    let portfolio = Portfolio::new(store.clone(), Arc::new(AutoAccept), navigator.clone());

    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();
    portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap();
    portfolio.remove_account(account.id).await.unwrap();

    assert_eq!(
        *navigator.0.lock().unwrap(),
        vec![NavigationRequest::AccountList]
    );
    assert!(matches!(
        store.account(account.id).await.unwrap_err(),
        LedgerError::StaleRecord(_)
    ));
}

#[tokio::test]
async fn removing_a_transaction_navigates_back() {
    let store = store().await;
    let navigator = Arc::new(RecordingNavigator::default());
    let portfolio = Portfolio::new(store.clone(), Arc::new(AutoAccept), navigator.clone());

    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();
    let tx = portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap();
    portfolio.remove_transaction(tx.id).await.unwrap();

    assert_eq!(*navigator.0.lock().unwrap(), vec![NavigationRequest::Back]);
    // The implicitly created holding survives the transaction removal.
    assert_eq!(store.account(account.id).await.unwrap().holdings.len(), 1);
}

#[tokio::test]
async fn operations_on_removed_records_are_stale() {
    let (portfolio, _store) = portfolio().await;
    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();
    portfolio.remove_account(account.id).await.unwrap();

    let err = portfolio
        .save_account(account.id, "Renamed", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StaleRecord(_)));

    let err = portfolio
        .add_transaction(account.id, draft("VWCE", 100.0, 10.0, 1_000.0, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StaleRecord(_)));
}

#[tokio::test]
async fn attaching_to_a_foreign_holding_id_fails() {
    let (portfolio, store) = portfolio().await;
    let account = portfolio.add_account("alice", "Broker", None).await.unwrap();
    let other = portfolio.add_account("bob", "Pension", None).await.unwrap();
    let foreign = portfolio.add_holding(other.id, "AGGH", None).await.unwrap();

    let by_id = |id| TransactionDraft {
        date: None,
        holding: HoldingRef::Id(id),
        price: Some(100.0),
        amount: Some(5.0),
        total: Some(500.0),
        notes: None,
    };

    // An id nothing resolves to.
    let err = portfolio
        .add_transaction(account.id, by_id(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.abort_cause(),
        Some(LedgerError::StaleRecord(_))
    ));

    // An id that resolves, but to another account's holding.
    let err = portfolio
        .add_transaction(account.id, by_id(foreign.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err.abort_cause(),
        Some(LedgerError::InvalidRecord(_))
    ));

    // Neither attempt committed anywhere.
    assert!(store.account(account.id).await.unwrap().transactions.is_empty());
    assert!(store.account(other.id).await.unwrap().transactions.is_empty());
    assert_eq!(store.holding_metrics(foreign.id).await.unwrap().total, 0.0);
}
