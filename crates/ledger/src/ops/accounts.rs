//! Account lifecycle.

use uuid::Uuid;

use super::Portfolio;
use crate::gate::ConfirmationRequest;
use crate::navigation::NavigationRequest;
use crate::util::{normalize_optional_text, normalize_required_name};
use crate::{Account, ResultLedger};

impl Portfolio {
    /// Create an account after confirmation.
    pub async fn add_account(
        &self,
        owner_id: &str,
        name: &str,
        notes: Option<String>,
    ) -> ResultLedger<Account> {
        let name = normalize_required_name(name, "account")?;
        let notes = normalize_optional_text(notes.as_deref());
        let request =
            ConfirmationRequest::new("Add account", format!("Add account \"{name}\"?"));
        let account = Account::new(owner_id.to_string(), name, notes);
        let id = account.id;
        self.gate
            .confirm(request, async {
                self.store.write(move |txn| txn.add_account(account)).await
            })
            .await?;
        self.store.account(id).await
    }

    /// Rename or annotate an account after confirmation.
    pub async fn save_account(
        &self,
        id: Uuid,
        name: &str,
        notes: Option<String>,
    ) -> ResultLedger<Account> {
        let name = normalize_required_name(name, "account")?;
        let notes = normalize_optional_text(notes.as_deref());
        self.store.account(id).await?;
        let request = ConfirmationRequest::new(
            "Save account",
            format!("Save changes to \"{name}\"?"),
        );
        self.gate
            .confirm(request, async {
                self.store
                    .write(move |txn| txn.update_account(id, name, notes))
                    .await
            })
            .await?;
        self.store.account(id).await
    }

    /// Remove an account and everything it owns, after confirmation.
    ///
    /// Also asks the boundary to leave the removed account's view.
    pub async fn remove_account(&self, id: Uuid) -> ResultLedger<()> {
        let account = self.store.account(id).await?;
        let request = ConfirmationRequest::new(
            "Remove account",
            format!(
                "Remove \"{}\" with {} holdings and {} transactions?",
                account.name,
                account.holdings.len(),
                account.transactions.len()
            ),
        );
        let removed = self
            .gate
            .confirm(request, async {
                self.store.write(move |txn| txn.remove_account(id)).await
            })
            .await?;
        tracing::info!(account = %removed.id, name = %removed.name, "account removed");
        self.navigator.request(NavigationRequest::AccountList);
        Ok(())
    }
}
