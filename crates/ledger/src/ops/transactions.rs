//! Transaction lifecycle.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Portfolio;
use crate::gate::ConfirmationRequest;
use crate::navigation::NavigationRequest;
use crate::util::normalize_optional_text;
use crate::{ResultLedger, Transaction};

/// How a draft refers to its holding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoldingRef {
    /// Resolve by name at commit time, creating the holding when absent.
    Name(String),
    /// Attach to an existing holding already on the account.
    Id(Uuid),
}

/// What a boundary submits to create a transaction.
///
/// The holding may still be a plain name here; it becomes a concrete id
/// inside the committing write transaction, never before.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionDraft {
    /// Defaults to now when unset.
    pub date: Option<DateTime<Utc>>,
    pub holding: HoldingRef,
    pub price: Option<f64>,
    pub amount: Option<f64>,
    pub total: Option<f64>,
    pub notes: Option<String>,
}

impl Portfolio {
    /// Commit a drafted transaction to an account after confirmation.
    ///
    /// Name resolution and the insert share one write transaction, so a
    /// failure after the holding was created rolls the holding back too. An
    /// explicit holding id must already live on the target account.
    pub async fn add_transaction(
        &self,
        account_id: Uuid,
        draft: TransactionDraft,
    ) -> ResultLedger<Transaction> {
        let account = self.store.account(account_id).await?;
        let request = ConfirmationRequest::new(
            "Add transaction",
            match &draft.holding {
                HoldingRef::Name(name) => {
                    format!("Add a transaction on \"{name}\" in \"{}\"?", account.name)
                }
                HoldingRef::Id(_) => format!("Add a transaction in \"{}\"?", account.name),
            },
        );
        let owner_id = account.owner_id;
        let id = self
            .gate
            .confirm(request, async {
                self.store
                    .write(move |txn| {
                        let holding_id = match &draft.holding {
                            HoldingRef::Name(name) => {
                                txn.resolve_holding(account_id, &owner_id, name)?
                            }
                            HoldingRef::Id(id) => *id,
                        };
                        let tx = Transaction::new(
                            draft.date.unwrap_or_else(Utc::now),
                            draft.price,
                            draft.amount,
                            draft.total,
                            normalize_optional_text(draft.notes.as_deref()),
                            holding_id,
                            account_id,
                            owner_id,
                        );
                        let id = tx.id;
                        txn.add_transaction(tx)?;
                        Ok(id)
                    })
                    .await
            })
            .await?;
        self.store.transaction(id).await
    }

    /// Save edits to a transaction after confirmation.
    ///
    /// The holding reference is left alone; editing never re-resolves.
    pub async fn save_transaction(
        &self,
        id: Uuid,
        date: DateTime<Utc>,
        price: Option<f64>,
        amount: Option<f64>,
        total: Option<f64>,
        notes: Option<String>,
    ) -> ResultLedger<Transaction> {
        self.store.transaction(id).await?;
        let notes = normalize_optional_text(notes.as_deref());
        self.gate
            .confirm(
                ConfirmationRequest::new("Save transaction", "Save changes to this transaction?"),
                async {
                    self.store
                        .write(move |txn| {
                            txn.update_transaction(id, date, price, amount, total, notes)
                        })
                        .await
                },
            )
            .await?;
        self.store.transaction(id).await
    }

    /// Remove a transaction after confirmation.
    pub async fn remove_transaction(&self, id: Uuid) -> ResultLedger<()> {
        self.store.transaction(id).await?;
        self.gate
            .confirm(
                ConfirmationRequest::new("Remove transaction", "Remove this transaction?"),
                async {
                    self.store
                        .write(move |txn| txn.remove_transaction(id))
                        .await
                },
            )
            .await?;
        self.navigator.request(NavigationRequest::Back);
        Ok(())
    }
}
