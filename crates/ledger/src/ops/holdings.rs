//! Holding lifecycle.
//!
//! Most holdings come into existence implicitly through transaction commits
//! (see `resolve_holding`); these are the explicit, gated paths.

use uuid::Uuid;

use super::Portfolio;
use crate::gate::ConfirmationRequest;
use crate::navigation::NavigationRequest;
use crate::util::{normalize_optional_text, normalize_required_name};
use crate::{Holding, ResultLedger};

impl Portfolio {
    /// Create a holding on an account after confirmation.
    pub async fn add_holding(
        &self,
        account_id: Uuid,
        name: &str,
        notes: Option<String>,
    ) -> ResultLedger<Holding> {
        let name = normalize_required_name(name, "holding")?;
        let notes = normalize_optional_text(notes.as_deref());
        let account = self.store.account(account_id).await?;
        let request = ConfirmationRequest::new(
            "Add holding",
            format!("Add holding \"{name}\" to \"{}\"?", account.name),
        );
        let holding = Holding::new(name, account.owner_id, account_id, notes);
        let id = holding.id;
        self.gate
            .confirm(request, async {
                self.store.write(move |txn| txn.add_holding(holding)).await
            })
            .await?;
        self.store.holding(id).await
    }

    /// Rename or annotate a holding after confirmation.
    pub async fn save_holding(
        &self,
        id: Uuid,
        name: &str,
        notes: Option<String>,
    ) -> ResultLedger<Holding> {
        let name = normalize_required_name(name, "holding")?;
        let notes = normalize_optional_text(notes.as_deref());
        self.store.holding(id).await?;
        let request = ConfirmationRequest::new(
            "Save holding",
            format!("Save changes to \"{name}\"?"),
        );
        self.gate
            .confirm(request, async {
                self.store
                    .write(move |txn| txn.update_holding(id, name, notes))
                    .await
            })
            .await?;
        self.store.holding(id).await
    }

    /// Remove a holding after confirmation.
    ///
    /// Its transactions stay on the account as orphans and drop out of the
    /// metrics until the ids are reused or cleaned up by hand.
    pub async fn remove_holding(&self, id: Uuid) -> ResultLedger<()> {
        let holding = self.store.holding(id).await?;
        let request = ConfirmationRequest::new(
            "Remove holding",
            format!(
                "Remove \"{}\"? Its transactions remain on the account.",
                holding.name
            ),
        );
        self.gate
            .confirm(request, async {
                self.store.write(move |txn| txn.remove_holding(id)).await
            })
            .await?;
        self.navigator.request(NavigationRequest::Back);
        Ok(())
    }
}
