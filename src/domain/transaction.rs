//! A single priced transfer of size between two sides: the unit both trades
//! and position changes are built from.

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::Market;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// `1` for buy, `-1` for sell; used to sign sizes and deltas.
    pub const fn sign(self) -> i32 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Actor {
    Maker,
    Taker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
    pub actor: Actor,
}

impl Transaction {
    pub fn new(price: Decimal, size: Decimal, side: Side, actor: Actor) -> Self {
        Self {
            price,
            size,
            side,
            actor,
        }
    }

    pub fn value(&self, market: &Market) -> Decimal {
        market.value_of(self.size, self.price)
    }

    /// `size`, negated when `side == Sell`.
    pub fn signed_size(&self) -> Decimal {
        Decimal::from(self.side.sign()) * self.size
    }
}
