//! Confirmation gating for destructive and persisting mutations.
//!
//! Every lifecycle mutation is prepared first and run only after an explicit
//! acceptance. The protocol has two states: a pending request, and an
//! accepted one. There is no rejection message; a boundary that wants to
//! decline simply drops its [`DecisionSender`], which leaves the prepared
//! action unresolved and untaken.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;

/// What the user is asked before a gated mutation runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub title: String,
    pub message: String,
}

impl ConfirmationRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// The only resolution a request can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Accepted,
}

/// One-shot handle a boundary uses to accept a pending request.
///
/// Dropping the handle without accepting declines the request; the gated
/// action is then dropped unrun.
pub struct DecisionSender(oneshot::Sender<Decision>);

impl DecisionSender {
    /// Accept the request and let the gated action run.
    pub fn accept(self) {
        // A receiver that lost interest already dropped the action.
        let _ = self.0.send(Decision::Accepted);
    }

    /// Decline by consuming the handle without sending.
    pub fn dismiss(self) {}
}

/// The boundary that presents confirmation requests to whoever decides.
pub trait Confirmations: Send + Sync {
    fn present(&self, request: ConfirmationRequest, decision: DecisionSender);
}

/// Accepts every request immediately. For tests and non-interactive tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoAccept;

impl Confirmations for AutoAccept {
    fn present(&self, _request: ConfirmationRequest, decision: DecisionSender) {
        decision.accept();
    }
}

/// Runs prepared mutations strictly behind a confirmation.
#[derive(Clone)]
pub struct MutationGate {
    confirmations: Arc<dyn Confirmations>,
}

impl MutationGate {
    pub fn new(confirmations: Arc<dyn Confirmations>) -> Self {
        Self { confirmations }
    }

    /// Present `request` and run `action` only on acceptance.
    ///
    /// A declined request drops the prepared action and never resolves;
    /// whoever needs to move on after a decline races this future against
    /// its own cancellation signal.
    pub async fn confirm<T>(
        &self,
        request: ConfirmationRequest,
        action: impl Future<Output = T>,
    ) -> T {
        let (tx, rx) = oneshot::channel();
        self.confirmations.present(request, DecisionSender(tx));
        match rx.await {
            Ok(Decision::Accepted) => action.await,
            Err(_) => {
                drop(action);
                std::future::pending().await
            }
        }
    }
}
