//! The simulator's own limit order book: maker orders resting at a price,
//! touched by incoming trades.

use std::cmp::Reverse;

use rust_decimal::Decimal;
use smol_str::SmolStr;

use crate::collection::{sorted_map::NearestTest, FnvIndexMap, SortedMap};
use crate::domain::{Order, Side};

#[derive(Debug, Clone, Default)]
pub struct LimitOrderBook {
    bids: SortedMap<Reverse<Decimal>, FnvIndexMap<SmolStr, Order>>,
    asks: SortedMap<Decimal, FnvIndexMap<SmolStr, Order>>,
}

impl LimitOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn price_of(order: &Order) -> Decimal {
        order.parameters.price.expect("maker order must carry a price")
    }

    pub fn add_order(&mut self, order: Order) {
        let price = Self::price_of(&order);
        match order.parameters.side {
            Side::Buy => self
                .bids
                .get_mut(&Reverse(price))
                .map(|level| {
                    level.insert(order.id.clone(), order.clone());
                })
                .unwrap_or_else(|| {
                    let mut level = FnvIndexMap::default();
                    level.insert(order.id.clone(), order);
                    self.bids.insert(Reverse(price), level);
                }),
            Side::Sell => self
                .asks
                .get_mut(&price)
                .map(|level| {
                    level.insert(order.id.clone(), order.clone());
                })
                .unwrap_or_else(|| {
                    let mut level = FnvIndexMap::default();
                    level.insert(order.id.clone(), order);
                    self.asks.insert(price, level);
                }),
        }
    }

    pub fn remove_order(&mut self, side: Side, price: Decimal, id: &str) -> Option<Order> {
        match side {
            Side::Buy => {
                let key = Reverse(price);
                let removed = self.bids.get_mut(&key).and_then(|level| level.shift_remove(id));
                if self.bids.get(&key).is_some_and(|level| level.is_empty()) {
                    self.bids.remove(&key);
                }
                removed
            }
            Side::Sell => {
                let removed = self.asks.get_mut(&price).and_then(|level| level.shift_remove(id));
                if self.asks.get(&price).is_some_and(|level| level.is_empty()) {
                    self.asks.remove(&price);
                }
                removed
            }
        }
    }

    /// Walks the opposite-side levels a trade at `(trade_side, trade_price)`
    /// touches, removing them from the book and returning the orders found.
    /// `pass_through = true` sweeps through the level exactly at
    /// `trade_price` too; `false` stops short of it (an order resting at the
    /// back of the queue at that exact price is not reached by a same-price
    /// print).
    pub fn touch(&mut self, trade_side: Side, trade_price: Decimal, pass_through: bool) -> Vec<Order> {
        let bound_test = if pass_through { NearestTest::Le } else { NearestTest::Lt };
        match trade_side {
            // a buy trade lifts resting asks at or below the trade price
            Side::Buy => {
                let touched_prices: Vec<Decimal> = self
                    .asks
                    .subrange(None, NearestTest::Ge, Some(&trade_price), bound_test)
                    .map(|(price, _)| *price)
                    .collect();
                touched_prices
                    .into_iter()
                    .filter_map(|price| self.asks.remove(&price))
                    .flat_map(|level| level.into_values())
                    .collect()
            }
            // a sell trade hits resting bids at or above the trade price
            Side::Sell => {
                let touched_keys: Vec<Reverse<Decimal>> = self
                    .bids
                    .subrange(None, NearestTest::Ge, Some(&Reverse(trade_price)), bound_test)
                    .map(|(key, _)| *key)
                    .collect();
                touched_keys
                    .into_iter()
                    .filter_map(|key| self.bids.remove(&key))
                    .flat_map(|level| level.into_values())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Actor, OrderParameters, TimeInForce};
    use rust_decimal_macros::dec;

    fn maker(id: &str, side: Side, price: Decimal) -> Order {
        Order::new(
            id,
            "BTCUSDT",
            OrderParameters {
                size: dec!(1),
                side,
                actor: Some(Actor::Maker),
                price: Some(price),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        )
    }

    #[test]
    fn touch_without_pass_through_stops_short_of_trade_price() {
        let mut book = LimitOrderBook::new();
        book.add_order(maker("s1", Side::Sell, dec!(100)));
        book.add_order(maker("s2", Side::Sell, dec!(101)));
        book.add_order(maker("s3", Side::Sell, dec!(102)));

        // a buy trade prints at 101: without pass_through, 101 is not reached
        let touched = book.touch(Side::Buy, dec!(101), false);
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].id, "s1");

        // with pass_through, the trade sweeps through 101 too
        let touched = book.touch(Side::Buy, dec!(101), true);
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].id, "s2");

        assert_eq!(book.asks.len(), 1);
    }

    #[test]
    fn remove_order_drops_empty_levels() {
        let mut book = LimitOrderBook::new();
        book.add_order(maker("b1", Side::Buy, dec!(99)));
        let removed = book.remove_order(Side::Buy, dec!(99), "b1");
        assert!(removed.is_some());
        assert_eq!(book.bids.len(), 0);
    }
}
