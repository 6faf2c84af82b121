//! The aggregation engine: pure valuation metrics over committed records.
//!
//! Nothing in this module stores state. Every figure is recomputed in full
//! from a holding's transactions and transfers on each evaluation; there is
//! no incremental patching to get wrong. Every division guards its
//! denominator and falls back to zero, so these functions never produce NaN
//! or infinity and never fail. Missing numeric fields contribute zero to the
//! sums for the same reason.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{Account, Transaction, Transfer};

/// Valuation of one holding, derived from its transaction and transfer sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HoldingMetrics {
    /// Net quantity held: `Σ amount`.
    pub amount: f64,
    /// Price of the transaction with the most recent date. Among equal
    /// dates the latest-inserted transaction wins.
    pub last_price: f64,
    /// Cost basis: `Σ price × amount`.
    pub transaction_cost_sum: f64,
    /// Cash moved: `Σ total`.
    pub total: f64,
    /// `total − transaction_cost_sum`: what trading cost on top of the prices.
    pub fees: f64,
    /// Weighted average purchase price; zero when nothing is held.
    pub average_price: f64,
    /// `average_price × amount`.
    pub average_value: f64,
    /// Market value at the last seen price: `last_price × amount`.
    pub value: f64,
    /// Dividends paid out: `Σ transfer amount`.
    pub dividend_sum: f64,
    /// `value + dividend_sum − total`.
    pub return_value: f64,
    /// Return over cash moved, in percent; zero when `total` is zero.
    pub return_percentage: f64,
}

impl HoldingMetrics {
    /// Recompute the full metric set from scratch.
    pub fn compute<'a, T, D>(transactions: T, transfers: D) -> Self
    where
        T: IntoIterator<Item = &'a Transaction>,
        D: IntoIterator<Item = &'a Transfer>,
    {
        let mut amount = 0.0;
        let mut transaction_cost_sum = 0.0;
        let mut total = 0.0;
        let mut last: Option<(DateTime<Utc>, f64)> = None;

        for tx in transactions {
            let quantity = tx.amount.unwrap_or(0.0);
            amount += quantity;
            transaction_cost_sum += tx.price.unwrap_or(0.0) * quantity;
            total += tx.total.unwrap_or(0.0);
            match last {
                Some((date, _)) if tx.date < date => {}
                _ => last = Some((tx.date, tx.price.unwrap_or(0.0))),
            }
        }

        let mut dividend_sum = 0.0;
        for transfer in transfers {
            dividend_sum += transfer.amount.unwrap_or(0.0);
        }

        let last_price = last.map(|(_, price)| price).unwrap_or(0.0);
        let average_price = if amount != 0.0 {
            transaction_cost_sum / amount
        } else {
            0.0
        };
        let value = last_price * amount;
        let return_percentage = if total != 0.0 {
            (value + dividend_sum - total) / total.abs() * 100.0
        } else {
            0.0
        };

        Self {
            amount,
            last_price,
            transaction_cost_sum,
            total,
            fees: total - transaction_cost_sum,
            average_price,
            average_value: average_price * amount,
            value,
            dividend_sum,
            return_value: value + dividend_sum - total,
            return_percentage,
        }
    }

    /// Metrics for one holding of an account.
    pub fn for_holding(account: &Account, holding_id: Uuid) -> Self {
        Self::compute(
            account.transactions_for(holding_id),
            account.transfers_for(holding_id),
        )
    }
}

/// Account-level rollup over the account's existing holdings.
///
/// Orphaned transactions, whose holding was deleted, are excluded by
/// construction: the rollup iterates holdings, not transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AccountMetrics {
    /// `Σ (value − total)` across holdings.
    pub balance: f64,
    /// `Σ value` across holdings.
    pub value: f64,
}

impl AccountMetrics {
    pub fn compute(account: &Account) -> Self {
        let mut balance = 0.0;
        let mut value = 0.0;
        for holding in &account.holdings {
            let metrics = HoldingMetrics::for_holding(account, holding.id);
            balance += metrics.value - metrics.total;
            value += metrics.value;
        }
        Self { balance, value }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::Holding;

    fn tx(
        holding_id: Uuid,
        secs: i64,
        price: Option<f64>,
        amount: Option<f64>,
        total: Option<f64>,
    ) -> Transaction {
        Transaction::new(
            Utc.timestamp_opt(secs, 0).unwrap(),
            price,
            amount,
            total,
            None,
            holding_id,
            Uuid::new_v4(),
            String::from("user-1"),
        )
    }

    fn dividend(holding_id: Uuid, secs: i64, amount: Option<f64>) -> Transfer {
        Transfer::new(
            Utc.timestamp_opt(secs, 0).unwrap(),
            amount,
            None,
            holding_id,
            Uuid::new_v4(),
            String::from("user-1"),
        )
    }

    #[test]
    fn buy_then_partial_sell() {
        let holding_id = Uuid::new_v4();
        let transactions = vec![
            tx(holding_id, 100, Some(100.0), Some(10.0), Some(1000.0)),
            tx(holding_id, 200, Some(120.0), Some(-5.0), Some(-600.0)),
        ];

        let m = HoldingMetrics::compute(&transactions, &[]);

        assert_eq!(m.amount, 5.0);
        assert_eq!(m.transaction_cost_sum, 400.0);
        assert_eq!(m.total, 400.0);
        assert_eq!(m.fees, 0.0);
        assert_eq!(m.average_price, 80.0);
        assert_eq!(m.last_price, 120.0);
        assert_eq!(m.average_value, 400.0);
        assert_eq!(m.value, 600.0);
        assert_eq!(m.dividend_sum, 0.0);
        assert_eq!(m.return_value, 200.0);
        assert_eq!(m.return_percentage, 50.0);
    }

    #[test]
    fn dividends_feed_the_return() {
        let holding_id = Uuid::new_v4();
        let transactions = vec![tx(holding_id, 100, Some(100.0), Some(10.0), Some(1000.0))];
        let transfers = vec![
            dividend(holding_id, 150, Some(30.0)),
            dividend(holding_id, 250, Some(20.0)),
            dividend(holding_id, 300, None),
        ];

        let m = HoldingMetrics::compute(&transactions, &transfers);

        assert_eq!(m.dividend_sum, 50.0);
        assert_eq!(m.value, 1000.0);
        assert_eq!(m.return_value, 50.0);
        assert_eq!(m.return_percentage, 5.0);
    }

    #[test]
    fn empty_sets_are_all_zero() {
        let m = HoldingMetrics::compute(&[], &[]);
        assert_eq!(m, HoldingMetrics::default());
    }

    #[test]
    fn sold_out_position_divides_nothing() {
        let holding_id = Uuid::new_v4();
        // Bought and fully sold: net amount is zero.
        let transactions = vec![
            tx(holding_id, 100, Some(100.0), Some(10.0), Some(1000.0)),
            tx(holding_id, 200, Some(110.0), Some(-10.0), Some(-1100.0)),
        ];

        let m = HoldingMetrics::compute(&transactions, &[]);

        assert_eq!(m.amount, 0.0);
        assert_eq!(m.average_price, 0.0);
        assert_eq!(m.average_value, 0.0);
        assert_eq!(m.value, 0.0);
        // total = -100, so the percentage branch still divides by |total|.
        assert_eq!(m.total, -100.0);
        assert_eq!(m.return_value, 100.0);
        assert_eq!(m.return_percentage, 100.0);
    }

    #[test]
    fn zero_total_never_divides() {
        let holding_id = Uuid::new_v4();
        // Non-zero value with zero cash moved must not divide by zero.
        let transactions = vec![tx(holding_id, 100, Some(50.0), Some(2.0), None)];

        let m = HoldingMetrics::compute(&transactions, &[]);

        assert_eq!(m.total, 0.0);
        assert_eq!(m.value, 100.0);
        assert_eq!(m.return_value, 100.0);
        assert_eq!(m.return_percentage, 0.0);
        assert!(m.return_percentage.is_finite());
    }

    #[test]
    fn missing_numeric_fields_count_as_zero() {
        let holding_id = Uuid::new_v4();
        let transactions = vec![
            tx(holding_id, 100, None, Some(3.0), Some(300.0)),
            tx(holding_id, 200, Some(10.0), None, None),
        ];

        let m = HoldingMetrics::compute(&transactions, &[]);

        assert_eq!(m.amount, 3.0);
        assert_eq!(m.transaction_cost_sum, 0.0);
        assert_eq!(m.total, 300.0);
        assert_eq!(m.last_price, 10.0);
        assert!(m.value.is_finite());
        assert!(m.return_percentage.is_finite());
    }

    #[test]
    fn last_price_follows_the_latest_date_not_insertion() {
        let holding_id = Uuid::new_v4();
        let transactions = vec![
            tx(holding_id, 300, Some(130.0), Some(1.0), Some(130.0)),
            tx(holding_id, 100, Some(100.0), Some(1.0), Some(100.0)),
        ];

        let m = HoldingMetrics::compute(&transactions, &[]);

        assert_eq!(m.last_price, 130.0);
    }

    #[test]
    fn equal_dates_take_the_latest_inserted_price() {
        let holding_id = Uuid::new_v4();
        let transactions = vec![
            tx(holding_id, 100, Some(100.0), Some(1.0), Some(100.0)),
            tx(holding_id, 100, Some(105.0), Some(1.0), Some(105.0)),
        ];

        let m = HoldingMetrics::compute(&transactions, &[]);

        assert_eq!(m.last_price, 105.0);
    }

    #[test]
    fn return_identity_is_insertion_order_independent() {
        let holding_id = Uuid::new_v4();
        let a = tx(holding_id, 100, Some(100.0), Some(10.0), Some(1003.5));
        let b = tx(holding_id, 200, Some(120.0), Some(-5.0), Some(-598.25));
        let c = tx(holding_id, 300, Some(90.0), Some(2.0), Some(181.0));
        let d = dividend(holding_id, 400, Some(12.5));

        let forward = HoldingMetrics::compute(vec![&a, &b, &c], vec![&d]);
        let reversed = HoldingMetrics::compute(vec![&c, &b, &a], vec![&d]);

        for m in [forward, reversed] {
            assert!((m.return_value - (m.value + m.dividend_sum - m.total)).abs() < 1e-9);
        }
        assert!((forward.return_value - reversed.return_value).abs() < 1e-9);
        assert_eq!(forward.last_price, reversed.last_price);
    }

    #[test]
    fn account_rollup_sums_existing_holdings_only() {
        let mut account = Account::new(String::from("user-1"), String::from("Broker"), None);
        let kept = Holding::new(
            String::from("VWCE"),
            account.owner_id.clone(),
            account.id,
            None,
        );
        let dropped = Holding::new(
            String::from("AGGH"),
            account.owner_id.clone(),
            account.id,
            None,
        );
        let kept_id = kept.id;
        let dropped_id = dropped.id;
        account.holdings.push(kept);
        account.holdings.push(dropped);
        account
            .transactions
            .push(tx(kept_id, 100, Some(100.0), Some(10.0), Some(1000.0)));
        account
            .transactions
            .push(tx(dropped_id, 100, Some(50.0), Some(4.0), Some(200.0)));

        let with_both = AccountMetrics::compute(&account);
        assert_eq!(with_both.value, 1000.0 + 200.0);
        assert_eq!(with_both.balance, 0.0);

        // Deleting the holding orphans its transaction and drops it from the
        // rollup, even though the row is still on the account.
        account.remove_holding(dropped_id);
        let after = AccountMetrics::compute(&account);
        assert_eq!(account.transactions.len(), 2);
        assert_eq!(after.value, 1000.0);
        assert_eq!(after.balance, 0.0);
    }

    #[test]
    fn empty_account_rolls_up_to_zero() {
        let account = Account::new(String::from("user-1"), String::from("Empty"), None);
        let m = AccountMetrics::compute(&account);
        assert_eq!(m.balance, 0.0);
        assert_eq!(m.value, 0.0);
    }
}
