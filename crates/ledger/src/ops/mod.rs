//! The gated operations a boundary calls on behalf of a user.
//!
//! Reads go straight to the store; every create, update and delete in here
//! passes the mutation gate first. There is no ungated write path.

mod accounts;
mod holdings;
mod transactions;
mod transfers;

pub use transactions::{HoldingRef, TransactionDraft};

use std::sync::Arc;

use crate::gate::{Confirmations, MutationGate};
use crate::navigation::Navigator;
use crate::store::LedgerStore;

/// The operations surface, wired to one confirmation and navigation
/// boundary.
pub struct Portfolio {
    store: Arc<LedgerStore>,
    gate: MutationGate,
    navigator: Arc<dyn Navigator>,
}

impl Portfolio {
    pub fn new(
        store: Arc<LedgerStore>,
        confirmations: Arc<dyn Confirmations>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            gate: MutationGate::new(confirmations),
            navigator,
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }
}
