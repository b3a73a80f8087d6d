//! A registry of live positions, one per market symbol: the stateful
//! counterpart to `position_accounting`'s pure functions, mirroring
//! [`super::reconciler::Reconciler`]'s registry shape but folding a trade
//! stream into [`Position`] instead of an order's execution state.

use rust_decimal::Decimal;
use smol_str::SmolStr;

use crate::collection::FnvIndexMap;
use crate::domain::{Market, Position, PositionPerformance, Trade};

use super::position_accounting::{apply_transaction, mark, PositionChange};

#[derive(Debug, Default)]
pub struct PositionBook {
    positions: FnvIndexMap<SmolStr, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, market_symbol: &str) -> Option<&Position> {
        self.positions.get(market_symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Folds `trade` into the position for its market, creating a flat
    /// position first if this is the market's first trade. Returns the
    /// change classification and the signed balance change the caller
    /// should apply to cash, per [`apply_transaction`].
    pub fn ingest_trade(&mut self, trade: &Trade, market: &Market) -> (PositionChange, Decimal) {
        let position = self
            .positions
            .entry(trade.market_symbol.clone())
            .or_insert_with(|| Position::flat(trade.market_symbol.clone()));
        apply_transaction(position, &trade.transaction(), market)
    }

    /// Marks the tracked position to `mark_price`, storing the resulting
    /// performance snapshot on the position itself. A no-op if the market
    /// isn't tracked or the position is flat.
    pub fn mark(&mut self, market_symbol: &str, mark_price: Decimal, market: &Market) -> Option<PositionPerformance> {
        let position = self.positions.get_mut(market_symbol)?;
        let performance = mark(position, mark_price, market.direction);
        position.performance = performance;
        performance
    }
}
