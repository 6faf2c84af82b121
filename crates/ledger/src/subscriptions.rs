//! Replica subscription bookkeeping.
//!
//! A boundary that mirrors the store from a remote replica asks for scoped
//! live feeds. Each scope must be requested from the replica exactly once;
//! this manager deduplicates the requests for the lifetime of the process.
//! Scopes are never unsubscribed.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

/// One scoped feed of the remote replica.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyncQuery {
    AccountsByOwner(String),
    HoldingsByOwner(String),
    TransactionsByOwner(String),
    TransfersByOwner(String),
    HoldingsForAccount(Uuid),
    TransactionsForAccount(Uuid),
    TransfersForAccount(Uuid),
}

/// The transport that actually talks to the replica.
///
/// `unsubscribe` exists on the boundary but the manager never calls it.
pub trait ReplicaClient: Send + Sync {
    fn subscribe(&self, query: &SyncQuery);
    fn unsubscribe(&self, query: &SyncQuery);
}

/// Drops every request. For tests and single-node deployments.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReplica;

impl ReplicaClient for NullReplica {
    fn subscribe(&self, _query: &SyncQuery) {}
    fn unsubscribe(&self, _query: &SyncQuery) {}
}

pub struct SubscriptionManager {
    replica: Arc<dyn ReplicaClient>,
    active: Mutex<HashSet<SyncQuery>>,
}

impl SubscriptionManager {
    pub fn new(replica: Arc<dyn ReplicaClient>) -> Self {
        Self {
            replica,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Request a scope from the replica unless it is already active.
    ///
    /// Returns whether the replica was actually asked this time.
    pub async fn add(&self, query: SyncQuery) -> bool {
        let mut active = self.active.lock().await;
        if active.contains(&query) {
            return false;
        }
        self.replica.subscribe(&query);
        active.insert(query);
        true
    }

    pub async fn contains(&self, query: &SyncQuery) -> bool {
        self.active.lock().await.contains(query)
    }

    /// Activate the owner-wide scopes a signed-in user needs.
    pub async fn subscribe_owner(&self, owner_id: &str) {
        let owner = owner_id.to_string();
        self.add(SyncQuery::AccountsByOwner(owner.clone())).await;
        self.add(SyncQuery::HoldingsByOwner(owner.clone())).await;
        self.add(SyncQuery::TransactionsByOwner(owner.clone())).await;
        self.add(SyncQuery::TransfersByOwner(owner)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ReplicaClient for Counting {
        fn subscribe(&self, _query: &SyncQuery) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn unsubscribe(&self, _query: &SyncQuery) {
            panic!("the manager never unsubscribes");
        }
    }

    #[tokio::test]
    async fn repeated_scopes_reach_the_replica_once() {
        let replica = Arc::new(Counting::default());
        let manager = SubscriptionManager::new(replica.clone());

        assert!(manager.add(SyncQuery::AccountsByOwner("user-1".into())).await);
        assert!(!manager.add(SyncQuery::AccountsByOwner("user-1".into())).await);
        assert!(manager.add(SyncQuery::AccountsByOwner("user-2".into())).await);

        assert_eq!(replica.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn owner_signin_activates_all_owner_scopes() {
        let replica = Arc::new(Counting::default());
        let manager = SubscriptionManager::new(replica.clone());

        manager.subscribe_owner("user-1").await;
        manager.subscribe_owner("user-1").await;

        assert_eq!(replica.0.load(Ordering::SeqCst), 4);
        assert!(
            manager
                .contains(&SyncQuery::TransfersByOwner("user-1".into()))
                .await
        );
    }
}
