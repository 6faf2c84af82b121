pub use account::Account;
pub use error::LedgerError;
pub use gate::{
    AutoAccept, ConfirmationRequest, Confirmations, Decision, DecisionSender, MutationGate,
};
pub use holding::Holding;
pub use live::LiveQuery;
pub use metrics::{AccountMetrics, HoldingMetrics};
pub use navigation::{NavigationRequest, Navigator, NullNavigator};
pub use ops::{HoldingRef, Portfolio, TransactionDraft};
pub use store::{LedgerStore, LedgerStoreBuilder};
pub use subscriptions::{NullReplica, ReplicaClient, SubscriptionManager, SyncQuery};
pub use transaction::Transaction;
pub use transfer::Transfer;
pub use txn::WriteTxn;
pub use util::numeric_field;

mod account;
mod error;
mod gate;
mod holding;
mod live;
mod metrics;
mod navigation;
mod ops;
mod store;
mod subscriptions;
mod transaction;
mod transfer;
mod txn;
mod util;

pub type ResultLedger<T> = Result<T, LedgerError>;
