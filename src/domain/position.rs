//! Position state: the entry we're holding and its mark-to-market performance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::transaction::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPerformance {
    pub pnl: Decimal,
    pub pnl_rate: Decimal,
    pub equity: Decimal,
    pub mark_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub market_symbol: SmolStr,
    pub entry: Option<PositionEntry>,
    pub performance: Option<PositionPerformance>,
}

impl Position {
    pub fn flat(market_symbol: impl Into<SmolStr>) -> Self {
        Self {
            market_symbol: market_symbol.into(),
            entry: None,
            performance: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.entry.is_none()
    }
}
