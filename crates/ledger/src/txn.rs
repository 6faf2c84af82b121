//! Write transactions: the only mutable surface of the store.
//!
//! A `WriteTxn` works on a draft copy of the committed state and records a
//! row-change journal. The store replays the journal into one database
//! transaction and swaps the draft in only after that commit succeeds; a
//! failing transaction body touches neither.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::stale;
use crate::store::StoreState;
use crate::util::normalize_required_name;
use crate::{Account, Holding, LedgerError, ResultLedger, Transaction, Transfer};

/// One persisted row change, replayed into the database on commit.
#[derive(Debug)]
pub(crate) enum Change {
    InsertAccount(Account),
    UpdateAccount(Account),
    /// The account row plus every row whose `account_id` matches, one sweep.
    DeleteAccountCascade(Uuid),
    InsertHolding(Holding),
    UpdateHolding(Holding),
    DeleteHolding(Uuid),
    InsertTransaction(Transaction),
    UpdateTransaction(Transaction),
    DeleteTransaction(Uuid),
    InsertTransfer(Transfer),
    UpdateTransfer(Transfer),
    DeleteTransfer(Uuid),
}

/// Exclusive mutable access to the store for the duration of one write.
///
/// Records read through a transaction are only valid inside it; re-fetch
/// inside the next transaction instead of caching across commits.
pub struct WriteTxn<'a> {
    state: &'a mut StoreState,
    journal: &'a mut Vec<Change>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(state: &'a mut StoreState, journal: &'a mut Vec<Change>) -> Self {
        Self { state, journal }
    }

    pub fn account(&self, id: Uuid) -> ResultLedger<&Account> {
        self.state.account(id).ok_or_else(|| stale("account", id))
    }

    pub fn holding(&self, id: Uuid) -> ResultLedger<&Holding> {
        self.state.find_holding(id).ok_or_else(|| stale("holding", id))
    }

    pub fn transaction(&self, id: Uuid) -> ResultLedger<&Transaction> {
        self.state
            .find_transaction(id)
            .ok_or_else(|| stale("transaction", id))
    }

    pub fn transfer(&self, id: Uuid) -> ResultLedger<&Transfer> {
        self.state
            .find_transfer(id)
            .ok_or_else(|| stale("transfer", id))
    }

    pub fn add_account(&mut self, mut account: Account) -> ResultLedger<()> {
        account.name = normalize_required_name(&account.name, "account")?;
        if self.state.account(account.id).is_some() {
            return Err(LedgerError::InvalidRecord(format!(
                "account {} already present",
                account.id
            )));
        }
        if !account.holdings.is_empty()
            || !account.transactions.is_empty()
            || !account.transfers.is_empty()
        {
            return Err(LedgerError::InvalidRecord(
                "a new account starts empty; attach children through their own calls".to_string(),
            ));
        }
        self.journal.push(Change::InsertAccount(account.clone()));
        self.state.accounts.push(account);
        Ok(())
    }

    pub fn update_account(
        &mut self,
        id: Uuid,
        name: String,
        notes: Option<String>,
    ) -> ResultLedger<()> {
        let name = normalize_required_name(&name, "account")?;
        let account = self.state.account_mut(id).ok_or_else(|| stale("account", id))?;
        account.name = name;
        account.notes = notes;
        self.journal.push(Change::UpdateAccount(account.clone()));
        Ok(())
    }

    /// Remove the account and everything it owns.
    ///
    /// Returns the removed aggregate so callers can report what went with it.
    pub fn remove_account(&mut self, id: Uuid) -> ResultLedger<Account> {
        let index = self
            .state
            .accounts
            .iter()
            .position(|account| account.id == id)
            .ok_or_else(|| stale("account", id))?;
        let account = self.state.accounts.remove(index);
        self.journal.push(Change::DeleteAccountCascade(id));
        Ok(account)
    }

    pub fn add_holding(&mut self, mut holding: Holding) -> ResultLedger<()> {
        holding.name = normalize_required_name(&holding.name, "holding")?;
        if self.state.find_holding(holding.id).is_some() {
            return Err(LedgerError::InvalidRecord(format!(
                "holding {} already present",
                holding.id
            )));
        }
        let account = self
            .state
            .account_mut(holding.account_id)
            .ok_or_else(|| stale("account", holding.account_id))?;
        self.journal.push(Change::InsertHolding(holding.clone()));
        account.holdings.push(holding);
        Ok(())
    }

    pub fn update_holding(
        &mut self,
        id: Uuid,
        name: String,
        notes: Option<String>,
    ) -> ResultLedger<()> {
        let name = normalize_required_name(&name, "holding")?;
        let holding = self.state.holding_mut(id).ok_or_else(|| stale("holding", id))?;
        holding.name = name;
        holding.notes = notes;
        self.journal.push(Change::UpdateHolding(holding.clone()));
        Ok(())
    }

    /// Detach a holding. Its transactions and transfers stay behind as
    /// orphans and drop out of aggregation.
    pub fn remove_holding(&mut self, id: Uuid) -> ResultLedger<Holding> {
        let holding = self
            .state
            .remove_holding(id)
            .ok_or_else(|| stale("holding", id))?;
        self.journal.push(Change::DeleteHolding(id));
        Ok(holding)
    }

    /// Resolve a holding name to an id, creating the holding when the name
    /// is new.
    ///
    /// Runs inside this transaction, so the created holding and whatever
    /// references it commit or roll back together. Matching is exact and
    /// case-sensitive; when duplicates exist the first in insertion order
    /// wins.
    pub fn resolve_holding(
        &mut self,
        account_id: Uuid,
        owner_id: &str,
        name: &str,
    ) -> ResultLedger<Uuid> {
        let name = normalize_required_name(name, "holding")?;
        let account = self
            .state
            .account(account_id)
            .ok_or_else(|| stale("account", account_id))?;
        if let Some(existing) = account.holding_by_name(&name) {
            return Ok(existing.id);
        }
        let holding = Holding::new(name, owner_id.to_string(), account_id, None);
        let id = holding.id;
        self.add_holding(holding)?;
        Ok(id)
    }

    /// The holding must already live on the same account; a missing id is
    /// stale and a cross-account id is invalid. Orphans only arise from
    /// holding removal, never from insertion.
    pub fn add_transaction(&mut self, tx: Transaction) -> ResultLedger<()> {
        if self.state.find_transaction(tx.id).is_some() {
            return Err(LedgerError::InvalidRecord(format!(
                "transaction {} already present",
                tx.id
            )));
        }
        let holding = self.holding(tx.holding_id)?;
        if holding.account_id != tx.account_id {
            return Err(LedgerError::InvalidRecord(format!(
                "holding {} is not on account {}",
                tx.holding_id, tx.account_id
            )));
        }
        let account = self
            .state
            .account_mut(tx.account_id)
            .ok_or_else(|| stale("account", tx.account_id))?;
        self.journal.push(Change::InsertTransaction(tx.clone()));
        account.transactions.push(tx);
        Ok(())
    }

    /// Edit a transaction in place. The holding reference is deliberately
    /// not editable here; re-resolution only happens on create.
    pub fn update_transaction(
        &mut self,
        id: Uuid,
        date: DateTime<Utc>,
        price: Option<f64>,
        amount: Option<f64>,
        total: Option<f64>,
        notes: Option<String>,
    ) -> ResultLedger<()> {
        let tx = self
            .state
            .transaction_mut(id)
            .ok_or_else(|| stale("transaction", id))?;
        tx.date = date;
        tx.price = price;
        tx.amount = amount;
        tx.total = total;
        tx.notes = notes;
        self.journal.push(Change::UpdateTransaction(tx.clone()));
        Ok(())
    }

    pub fn remove_transaction(&mut self, id: Uuid) -> ResultLedger<Transaction> {
        let tx = self
            .state
            .remove_transaction(id)
            .ok_or_else(|| stale("transaction", id))?;
        self.journal.push(Change::DeleteTransaction(id));
        Ok(tx)
    }

    /// Same holding rule as [`add_transaction`](Self::add_transaction).
    pub fn add_transfer(&mut self, transfer: Transfer) -> ResultLedger<()> {
        if self.state.find_transfer(transfer.id).is_some() {
            return Err(LedgerError::InvalidRecord(format!(
                "transfer {} already present",
                transfer.id
            )));
        }
        let holding = self.holding(transfer.holding_id)?;
        if holding.account_id != transfer.account_id {
            return Err(LedgerError::InvalidRecord(format!(
                "holding {} is not on account {}",
                transfer.holding_id, transfer.account_id
            )));
        }
        let account = self
            .state
            .account_mut(transfer.account_id)
            .ok_or_else(|| stale("account", transfer.account_id))?;
        self.journal.push(Change::InsertTransfer(transfer.clone()));
        account.transfers.push(transfer);
        Ok(())
    }

    pub fn update_transfer(
        &mut self,
        id: Uuid,
        date: DateTime<Utc>,
        amount: Option<f64>,
        notes: Option<String>,
    ) -> ResultLedger<()> {
        let transfer = self
            .state
            .transfer_mut(id)
            .ok_or_else(|| stale("transfer", id))?;
        transfer.date = date;
        transfer.amount = amount;
        transfer.notes = notes;
        self.journal.push(Change::UpdateTransfer(transfer.clone()));
        Ok(())
    }

    pub fn remove_transfer(&mut self, id: Uuid) -> ResultLedger<Transfer> {
        let transfer = self
            .state
            .remove_transfer(id)
            .ok_or_else(|| stale("transfer", id))?;
        self.journal.push(Change::DeleteTransfer(id));
        Ok(transfer)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn seeded() -> (StoreState, Uuid) {
        let mut state = StoreState::default();
        let account = Account::new(String::from("user-1"), String::from("Broker"), None);
        let account_id = account.id;
        state.accounts.push(account);
        (state, account_id)
    }

    fn txn<'a>(state: &'a mut StoreState, journal: &'a mut Vec<Change>) -> WriteTxn<'a> {
        WriteTxn::new(state, journal)
    }

    #[test]
    fn resolve_reuses_an_existing_holding() {
        let (mut state, account_id) = seeded();
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);

        let first = txn.resolve_holding(account_id, "user-1", "VWCE").unwrap();
        let second = txn.resolve_holding(account_id, "user-1", "VWCE").unwrap();

        assert_eq!(first, second);
        assert_eq!(state.accounts[0].holdings.len(), 1);
    }

    #[test]
    fn resolve_picks_the_first_duplicate() {
        let (mut state, account_id) = seeded();
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);
        let first = Holding::new(
            String::from("VWCE"),
            String::from("user-1"),
            account_id,
            None,
        );
        let first_id = first.id;
        txn.add_holding(first).unwrap();
        txn.add_holding(Holding::new(
            String::from("VWCE"),
            String::from("user-1"),
            account_id,
            None,
        ))
        .unwrap();

        let resolved = txn.resolve_holding(account_id, "user-1", "VWCE").unwrap();
        assert_eq!(resolved, first_id);
    }

    #[test]
    fn resolve_against_a_missing_account_is_stale() {
        let (mut state, _) = seeded();
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);

        let gone = Uuid::new_v4();
        let err = txn.resolve_holding(gone, "user-1", "VWCE").unwrap_err();
        assert_eq!(err, stale("account", gone));
    }

    #[test]
    fn remove_account_takes_children_with_it() {
        let (mut state, account_id) = seeded();
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);
        let holding_id = txn.resolve_holding(account_id, "user-1", "VWCE").unwrap();
        txn.add_transaction(Transaction::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            Some(100.0),
            Some(10.0),
            Some(1000.0),
            None,
            holding_id,
            account_id,
            String::from("user-1"),
        ))
        .unwrap();

        let removed = txn.remove_account(account_id).unwrap();

        assert_eq!(removed.holdings.len(), 1);
        assert_eq!(removed.transactions.len(), 1);
        assert!(state.accounts.is_empty());
        assert!(matches!(
            journal.last(),
            Some(Change::DeleteAccountCascade(id)) if *id == account_id
        ));
    }

    #[test]
    fn transactions_cannot_cross_accounts() {
        let (mut state, account_id) = seeded();
        let other = Account::new(String::from("bob"), String::from("Pension"), None);
        let other_id = other.id;
        state.accounts.push(other);
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);
        let holding_id = txn.resolve_holding(other_id, "bob", "AGGH").unwrap();

        let err = txn
            .add_transaction(Transaction::new(
                Utc.timestamp_opt(0, 0).unwrap(),
                Some(100.0),
                Some(5.0),
                Some(500.0),
                None,
                holding_id,
                account_id,
                String::from("alice"),
            ))
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidRecord(_)));
        assert!(state.accounts.iter().all(|a| a.transactions.is_empty()));
    }

    #[test]
    fn updates_on_missing_records_are_stale() {
        let (mut state, _) = seeded();
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);

        let gone = Uuid::new_v4();
        assert_eq!(
            txn.update_holding(gone, String::from("VWCE"), None)
                .unwrap_err(),
            stale("holding", gone)
        );
        assert_eq!(
            txn.remove_transaction(gone).unwrap_err(),
            stale("transaction", gone)
        );
    }

    #[test]
    fn blank_names_never_enter_the_store() {
        let (mut state, account_id) = seeded();
        let mut journal = Vec::new();
        let mut txn = txn(&mut state, &mut journal);

        let err = txn.resolve_holding(account_id, "user-1", "   ").unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidRecord("holding name must not be empty".to_string())
        );
        assert!(journal.is_empty());
    }
}
