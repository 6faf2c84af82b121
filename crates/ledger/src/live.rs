//! Live query handles.
//!
//! A live query is an observable result set: the store re-evaluates it after
//! every committing write and publishes the new value before the write call
//! returns, so a `current()` read issued after a write always sees the
//! committed state. Values that did not change are not re-published.

use tokio::sync::watch;

/// Handle to an observable result set registered on the store.
#[derive(Debug)]
pub struct LiveQuery<V> {
    rx: watch::Receiver<V>,
}

impl<V: Clone> LiveQuery<V> {
    pub(crate) fn new(rx: watch::Receiver<V>) -> Self {
        Self { rx }
    }

    /// The latest committed value.
    pub fn current(&self) -> V {
        self.rx.borrow().clone()
    }

    /// Wait until the value is re-published with a change.
    ///
    /// Returns `false` once the store has been dropped; the last value stays
    /// readable through [`current`](Self::current).
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
