//! Navigation signals emitted after destructive mutations.
//!
//! Removing a record can leave a boundary looking at something that no
//! longer exists. The operations emit a [`NavigationRequest`] right after
//! such a removal; the boundary decides what the request means for its own
//! surface.

/// Where a boundary should move after a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationRequest {
    /// The account overview, after an account is removed.
    AccountList,
    /// One step back, after a record inside an account is removed.
    Back,
}

pub trait Navigator: Send + Sync {
    fn request(&self, request: NavigationRequest);
}

/// Ignores every request. For tests and headless tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn request(&self, _request: NavigationRequest) {}
}
