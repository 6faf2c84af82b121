//! Transfer lifecycle. Dividends and other cash movements on a holding.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Portfolio;
use crate::gate::ConfirmationRequest;
use crate::navigation::NavigationRequest;
use crate::util::normalize_optional_text;
use crate::{ResultLedger, Transfer};

impl Portfolio {
    /// Record a transfer against an existing holding after confirmation.
    pub async fn add_transfer(
        &self,
        holding_id: Uuid,
        date: Option<DateTime<Utc>>,
        amount: Option<f64>,
        notes: Option<String>,
    ) -> ResultLedger<Transfer> {
        let holding = self.store.holding(holding_id).await?;
        let request = ConfirmationRequest::new(
            "Add transfer",
            format!("Record a transfer on \"{}\"?", holding.name),
        );
        let transfer = Transfer::new(
            date.unwrap_or_else(Utc::now),
            amount,
            normalize_optional_text(notes.as_deref()),
            holding_id,
            holding.account_id,
            holding.owner_id,
        );
        let id = transfer.id;
        self.gate
            .confirm(request, async {
                self.store.write(move |txn| txn.add_transfer(transfer)).await
            })
            .await?;
        self.store.transfer(id).await
    }

    /// Save edits to a transfer after confirmation.
    pub async fn save_transfer(
        &self,
        id: Uuid,
        date: DateTime<Utc>,
        amount: Option<f64>,
        notes: Option<String>,
    ) -> ResultLedger<Transfer> {
        self.store.transfer(id).await?;
        let notes = normalize_optional_text(notes.as_deref());
        self.gate
            .confirm(
                ConfirmationRequest::new("Save transfer", "Save changes to this transfer?"),
                async {
                    self.store
                        .write(move |txn| txn.update_transfer(id, date, amount, notes))
                        .await
                },
            )
            .await?;
        self.store.transfer(id).await
    }

    /// Remove a transfer after confirmation.
    pub async fn remove_transfer(&self, id: Uuid) -> ResultLedger<()> {
        self.store.transfer(id).await?;
        self.gate
            .confirm(
                ConfirmationRequest::new("Remove transfer", "Remove this transfer?"),
                async {
                    self.store
                        .write(move |txn| txn.remove_transfer(id))
                        .await
                },
            )
            .await?;
        self.navigator.request(NavigationRequest::Back);
        Ok(())
    }
}
