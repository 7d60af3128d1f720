use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A death cross.
    Crossover,
    /// The series ended with the position still open; it was closed at the last close.
    EndOfData,
}

/// The open long position while the engine walks the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Position {
    entry_date: NaiveDate,
    // execution price, slippage included
    entry_price: f64,
    quantity: f64,
    entry_fee: f64,
    // capital available just before entry
    committed: f64,
}

impl Position {
    pub(crate) fn new(entry_date: NaiveDate, entry_price: f64, quantity: f64, entry_fee: f64, committed: f64) -> Self {
        Self {
            entry_date,
            entry_price,
            quantity,
            entry_fee,
            committed,
        }
    }

    pub(crate) fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub(crate) fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub(crate) fn quantity(&self) -> f64 {
        self.quantity
    }

    pub(crate) fn entry_fee(&self) -> f64 {
        self.entry_fee
    }

    pub(crate) fn committed(&self) -> f64 {
        self.committed
    }

    /// Notional paid at entry.
    pub(crate) fn cost(&self) -> f64 {
        self.quantity * self.entry_price
    }

    /// Mark-to-market value at `price`.
    pub(crate) fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Realizes the position at `exit_price`, net of both fees.
    ///
    /// A trade never loses more than the capital committed to it.
    pub(crate) fn close(self, exit_date: NaiveDate, exit_price: f64, exit_fee: f64, reason: ExitReason) -> Trade {
        let fees = self.entry_fee + exit_fee;
        let profit = (self.quantity * (exit_price - self.entry_price) - fees).max(-self.committed);
        let cost = self.cost();
        let return_pct = if cost > 0.0 { profit / cost * 100.0 } else { 0.0 };

        Trade {
            entry_date: self.entry_date,
            exit_date,
            entry_price: self.entry_price,
            exit_price,
            quantity: self.quantity,
            profit,
            return_pct,
            fees,
            exit_reason: reason,
        }
    }
}

/// One completed round trip.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    entry_date: NaiveDate,
    exit_date: NaiveDate,
    entry_price: f64,
    exit_price: f64,
    quantity: f64,
    profit: f64,
    return_pct: f64,
    fees: f64,
    exit_reason: ExitReason,
}

impl Trade {
    /// Returns the entry day.
    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    /// Returns the exit day.
    pub fn exit_date(&self) -> NaiveDate {
        self.exit_date
    }

    /// Returns the entry execution price (slippage included).
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the exit execution price (slippage included).
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Returns the traded quantity (fractional units allowed).
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the realized profit, net of both fees.
    ///
    /// Bounded below by minus the committed capital, so the ledger always agrees with the
    /// equity curve.
    pub fn profit(&self) -> f64 {
        self.profit
    }

    /// Returns the profit as a percentage of the notional committed at entry.
    pub fn return_pct(&self) -> f64 {
        self.return_pct
    }

    /// Returns the fees charged on both legs.
    pub fn fees(&self) -> f64 {
        self.fees
    }

    /// Returns why the position was closed.
    pub fn exit_reason(&self) -> ExitReason {
        self.exit_reason
    }

    /// Returns `true` for a strictly profitable trade.
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    /// Returns `true` for a strictly losing trade.
    pub fn is_loss(&self) -> bool {
        self.profit < 0.0
    }
}

#[cfg(test)]
pub(crate) fn create_trade(profit: f64) -> Trade {
    let entry = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let exit = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
    // one unit bought at 100.0, sold at 100.0 + profit
    Position::new(entry, 100.0, 1.0, 0.0, 100.0).close(exit, 100.0 + profit, 0.0, ExitReason::Crossover)
}
