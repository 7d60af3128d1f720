use tracing::{debug, warn};

use super::{Candle, ExitReason, Position, Trade};
use crate::BasisPointCalculus;
use crate::config::StrategyConfig;

/// Cash side of the simulation: idle capital, cumulative fees and the cost model.
#[derive(Debug, Clone)]
pub(crate) struct Wallet {
    // Initial capital
    initial_capital: f64,
    // Idle cash, zero while a position is open
    capital: f64,
    // Cumulative fees paid
    fees: f64,
    fee_bps: f64,
    slippage_bps: f64,
}

impl Wallet {
    pub(crate) fn new(config: &StrategyConfig) -> Self {
        Self {
            initial_capital: config.initial_capital(),
            capital: config.initial_capital(),
            fees: 0.0,
            fee_bps: config.fee_bps(),
            slippage_bps: config.slippage_bps(),
        }
    }

    pub(crate) fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Returns the idle capital.
    pub(crate) fn capital(&self) -> f64 {
        self.capital
    }

    /// Returns the fees paid on closed trades.
    pub(crate) fn fees_paid(&self) -> f64 {
        self.fees
    }

    /// Buying costs more: the close plus slippage.
    pub(crate) fn entry_price(&self, close: f64) -> f64 {
        close.addbps(self.slippage_bps)
    }

    /// Selling realizes less: the close minus slippage.
    pub(crate) fn exit_price(&self, close: f64) -> f64 {
        close.subbps(self.slippage_bps)
    }

    /// Fee charged on a notional.
    pub(crate) fn fee(&self, notional: f64) -> f64 {
        notional.how_many(self.fee_bps)
    }

    /// Commits all idle capital to a long position at the candle close.
    ///
    /// Returns `None` once capital is exhausted.
    pub(crate) fn open(&mut self, candle: &Candle) -> Option<Position> {
        if self.capital <= 0.0 {
            warn!(date = %candle.date(), "Capital exhausted, entry skipped");
            return None;
        }

        let entry_price = self.entry_price(candle.close());
        let quantity = self.capital / entry_price;
        let entry_fee = self.fee(quantity * entry_price);
        let position = Position::new(candle.date(), entry_price, quantity, entry_fee, self.capital);
        self.capital = 0.0;

        debug!(
            date = %position.entry_date(),
            price = position.entry_price(),
            quantity = position.quantity(),
            fee = position.entry_fee(),
            "Opened LONG position"
        );
        Some(position)
    }

    /// Realizes the position at the candle close and returns the capital, with its
    /// profit, to the wallet. The profit is capped at `-committed`, so capital never goes
    /// below zero.
    pub(crate) fn close(&mut self, position: Position, candle: &Candle, reason: ExitReason) -> Trade {
        let exit_price = self.exit_price(candle.close());
        let exit_fee = self.fee(position.quantity() * exit_price);
        let committed = position.committed();
        let trade = position.close(candle.date(), exit_price, exit_fee, reason);

        self.fees += trade.fees();
        self.capital = (committed + trade.profit()).max(0.0);

        debug!(
            entry = %trade.entry_date(),
            exit = %trade.exit_date(),
            price = trade.exit_price(),
            profit = trade.profit(),
            reason = ?reason,
            "Closed position"
        );
        trade
    }

    /// Total value: idle capital plus the open position marked at `close`.
    pub(crate) fn equity(&self, position: Option<&Position>, close: f64) -> f64 {
        self.capital + position.map_or(0.0, |p| p.market_value(close))
    }
}
