//! Market-data order book: bids descending, asks ascending, patched
//! incrementally by `(side, price, new_size)` rows.

use std::cmp::Reverse;

use rust_decimal::Decimal;

use crate::collection::SortedMap;

use super::transaction::Side;

#[derive(Debug, Clone, Default)]
pub struct Orderbook {
    bids: SortedMap<Reverse<Decimal>, Decimal>,
    asks: SortedMap<Decimal, Decimal>,
}

/// One row of an incremental book update: `size = None` removes the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookRow {
    pub side: Side,
    pub price: Decimal,
    pub size: Option<Decimal>,
}

impl Orderbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, row: BookRow) {
        match (row.side, row.size) {
            (Side::Buy, Some(size)) => {
                self.bids.insert(Reverse(row.price), size);
            }
            (Side::Buy, None) => {
                self.bids.remove(&Reverse(row.price));
            }
            (Side::Sell, Some(size)) => {
                self.asks.insert(row.price, size);
            }
            (Side::Sell, None) => {
                self.asks.remove(&row.price);
            }
        }
    }

    pub fn apply_rows(&mut self, rows: impl IntoIterator<Item = BookRow>) {
        for row in rows {
            self.apply(row);
        }
    }

    pub fn best_bid(&self) -> Option<(Decimal, Decimal)> {
        self.bids.first().map(|(Reverse(price), size)| (*price, *size))
    }

    pub fn best_ask(&self) -> Option<(Decimal, Decimal)> {
        self.asks.first().map(|(price, size)| (*price, *size))
    }

    pub fn bids(&self) -> impl DoubleEndedIterator<Item = (Decimal, Decimal)> + '_ {
        self.bids.iter().map(|(Reverse(price), size)| (*price, *size))
    }

    pub fn asks(&self) -> impl DoubleEndedIterator<Item = (Decimal, Decimal)> + '_ {
        self.asks.iter().map(|(price, size)| (*price, *size))
    }

    /// Whether the book is in a valid, uncrossed state: best bid < best ask.
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid >= ask,
            _ => false,
        }
    }
}
