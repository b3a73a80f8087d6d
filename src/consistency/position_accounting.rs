//! Trade-driven position accounting: open/increase/decrease/close/flip
//! classification and direction-specific PnL.

use rust_decimal::Decimal;

use crate::domain::{Market, MarketDirection, Position, PositionEntry, PositionPerformance, Side, Transaction};

/// The outcome of folding one transaction into a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChange {
    Open,
    Increase,
    Decrease,
    Close,
    Flip,
}

pub fn pnl(entry: &PositionEntry, at_price: Decimal, direction: MarketDirection) -> Decimal {
    match (direction, entry.side) {
        (MarketDirection::Linear, Side::Buy) => (at_price - entry.price) * entry.size,
        (MarketDirection::Linear, Side::Sell) => (entry.price - at_price) * entry.size,
        (MarketDirection::Inverse, Side::Buy) => entry.size / entry.price - entry.size / at_price,
        (MarketDirection::Inverse, Side::Sell) => entry.size / at_price - entry.size / entry.price,
    }
}

pub fn equity(entry: &PositionEntry, at_price: Decimal, direction: MarketDirection) -> Decimal {
    entry.value + pnl(entry, at_price, direction)
}

fn average_price(a_size: Decimal, a_price: Decimal, b_size: Decimal, b_price: Decimal, market: &Market) -> Decimal {
    let total_size = a_size + b_size;
    match market.direction {
        MarketDirection::Linear => (a_size * a_price + b_size * b_price) / total_size,
        MarketDirection::Inverse => total_size / (a_size / a_price + b_size / b_price),
    }
}

/// Applies `tx` to `position`, returning the classification and the signed
/// balance change the account should apply. Handles a same-transaction flip
/// by internally splitting `tx` into a closing leg and a re-opening leg.
pub fn apply_transaction(
    position: &mut Position,
    tx: &Transaction,
    market: &Market,
) -> (PositionChange, Decimal) {
    let Some(entry) = position.entry else {
        let value = market.value_of(tx.size, tx.price);
        position.entry = Some(PositionEntry {
            side: tx.side,
            size: tx.size,
            price: tx.price,
            value,
        });
        return (PositionChange::Open, -value);
    };

    if tx.side == entry.side {
        let new_size = entry.size + tx.size;
        let new_price = average_price(entry.size, entry.price, tx.size, tx.price, market);
        let new_value = market.value_of(new_size, new_price);
        position.entry = Some(PositionEntry {
            side: entry.side,
            size: new_size,
            price: new_price,
            value: new_value,
        });
        return (PositionChange::Increase, -market.value_of(tx.size, tx.price));
    }

    match tx.size.cmp(&entry.size) {
        std::cmp::Ordering::Less => {
            let consumed_value = entry.value * (tx.size / entry.size);
            let consumed = PositionEntry {
                side: entry.side,
                size: tx.size,
                price: entry.price,
                value: consumed_value,
            };
            let remainder_size = entry.size - tx.size;
            let remainder = PositionEntry {
                side: entry.side,
                size: remainder_size,
                price: entry.price,
                value: entry.value - consumed_value,
            };
            let change = consumed_value + pnl(&consumed, tx.price, market.direction);
            position.entry = Some(remainder);
            (PositionChange::Decrease, change)
        }
        std::cmp::Ordering::Equal => {
            let change = equity(&entry, tx.price, market.direction);
            position.entry = None;
            (PositionChange::Close, change)
        }
        std::cmp::Ordering::Greater => {
            let close_change = equity(&entry, tx.price, market.direction);
            let remaining_size = tx.size - entry.size;
            let value = market.value_of(remaining_size, tx.price);
            position.entry = Some(PositionEntry {
                side: tx.side,
                size: remaining_size,
                price: tx.price,
                value,
            });
            (PositionChange::Flip, close_change - value)
        }
    }
}

pub fn mark(position: &Position, mark_price: Decimal, direction: MarketDirection) -> Option<PositionPerformance> {
    let entry = position.entry?;
    let pnl_value = pnl(&entry, mark_price, direction);
    let equity_value = entry.value + pnl_value;
    Some(PositionPerformance {
        pnl: pnl_value,
        pnl_rate: pnl_value / entry.value,
        equity: equity_value,
        mark_price,
    })
}
