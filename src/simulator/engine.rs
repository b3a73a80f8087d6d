//! Deterministic simulator: drives a limit order book and taker queues from
//! a stream of historical trades and commands.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use smol_str::SmolStr;

use crate::collection::FnvIndexMap;
use crate::consistency::{ingest_trade, PositionBook};
use crate::domain::{
    Actor, Balance, CancellationStatus, Fee, Market, Order, OrderParameters, OrderStatus, Position,
    Side, Trade,
};
use crate::error::{ErrorCategory, XchangeError};

use super::limit_order_book::LimitOrderBook;

#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
}

#[derive(Debug, Clone)]
struct LatestTrade {
    price: Decimal,
    side: Side,
    time: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Simulator {
    market: Market,
    fees: FeeSchedule,
    orders: FnvIndexMap<SmolStr, Order>,
    book: LimitOrderBook,
    taker_queue_buy: VecDeque<SmolStr>,
    taker_queue_sell: VecDeque<SmolStr>,
    latest_trade: Option<LatestTrade>,
    positions: PositionBook,
    cash: FnvIndexMap<SmolStr, Balance>,
}

impl Simulator {
    pub fn new(market: Market, fees: FeeSchedule) -> Self {
        Self {
            market,
            fees,
            orders: FnvIndexMap::default(),
            book: LimitOrderBook::new(),
            taker_queue_buy: VecDeque::new(),
            taker_queue_sell: VecDeque::new(),
            latest_trade: None,
            positions: PositionBook::new(),
            cash: FnvIndexMap::default(),
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest_trade.as_ref().map(|t| t.time)
    }

    /// The simulator's own net position accrued from every fill it has
    /// produced so far, marked to the most recent print.
    pub fn position(&self) -> Option<&Position> {
        self.positions.get(&self.market.symbol)
    }

    /// The cash balance in `asset`, accrued from every fill's settlement and
    /// fee. `None` until the first fill settling in that asset.
    pub fn balance(&self, asset: &str) -> Option<&Balance> {
        self.cash.get(asset)
    }

    /// Applies a fill's position-settlement value and its fee to the
    /// market's settlement asset balance.
    fn settle(&mut self, trade: &Trade, position_balance_change: Decimal) {
        let asset = self.market.settlement_asset().clone();
        let balance = self.cash.entry(asset).or_insert_with(Balance::default);
        balance.apply(position_balance_change);
        if let Some(fee) = &trade.fee {
            balance.apply(fee.balance_change);
        }
    }

    fn taker_queue_mut(&mut self, side: Side) -> &mut VecDeque<SmolStr> {
        match side {
            Side::Buy => &mut self.taker_queue_buy,
            Side::Sell => &mut self.taker_queue_sell,
        }
    }

    /// Whether a maker order at `price, side` is valid relative to the
    /// latest trade, per the simulator's posting-side rule: a resting order
    /// may not already be marketable against the last print.
    fn is_valid_maker_price(&self, side: Side, price: Decimal) -> bool {
        let Some(latest) = &self.latest_trade else {
            return true;
        };
        match side {
            Side::Buy => {
                if latest.side == Side::Buy {
                    price < latest.price
                } else {
                    price <= latest.price
                }
            }
            Side::Sell => {
                if latest.side == Side::Sell {
                    price > latest.price
                } else {
                    price >= latest.price
                }
            }
        }
    }

    /// Opens a batch of orders, each becoming a maker resting order, a
    /// queued taker order, or a rejection.
    pub fn open_orders(&mut self, orders: Vec<(SmolStr, OrderParameters)>) -> Vec<Order> {
        let mut updates = Vec::with_capacity(orders.len());
        for (id, parameters) in orders {
            if self.orders.contains_key(&id) {
                let order = Order::new(id, self.market.symbol.clone(), parameters)
                    .rejected(ErrorCategory::InvalidParams);
                updates.push(order);
                continue;
            }

            let wants_maker = parameters.actor == Some(Actor::Maker) || parameters.actor.is_none();
            let can_be_maker = wants_maker
                && parameters
                    .price
                    .is_some_and(|price| self.is_valid_maker_price(parameters.side, price));

            let actor = if can_be_maker {
                Actor::Maker
            } else if parameters.actor == Some(Actor::Maker) {
                let order = Order::new(id, self.market.symbol.clone(), parameters)
                    .rejected(ErrorCategory::InvalidParams);
                updates.push(order);
                continue;
            } else {
                Actor::Taker
            };

            let mut parameters = parameters;
            parameters.actor = Some(actor);
            let mut order = Order::new(id.clone(), self.market.symbol.clone(), parameters);
            order.execution.status = OrderStatus::Created;

            match actor {
                Actor::Maker => self.book.add_order(order.clone()),
                Actor::Taker => self.taker_queue_mut(order.parameters.side).push_back(id.clone()),
            }
            self.orders.insert(id, order.clone());
            updates.push(order);
        }
        updates
    }

    pub fn cancel_orders(&mut self, ids: Vec<SmolStr>) -> Vec<Order> {
        let mut updates = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(order) = self.orders.get(&id) else {
                updates.push(
                    Order::new(id, self.market.symbol.clone(), dummy_params())
                        .rejected(ErrorCategory::NotFound),
                );
                continue;
            };
            if order.parameters.actor == Some(Actor::Taker) {
                let mut order = order.clone();
                order.cancellation = Some(CancellationStatus::Rejected);
                updates.push(order);
                continue;
            }
            let price = order.parameters.price.expect("maker order has a price");
            let side = order.parameters.side;
            self.book.remove_order(side, price, &id);
            if let Some(order) = self.orders.get_mut(&id) {
                order.execution.status = OrderStatus::Cancelled;
                order.cancellation = Some(CancellationStatus::Created);
                updates.push(order.clone());
            }
        }
        updates
    }

    /// Ingests a batch of trades, filling resting makers first, then the
    /// taker queue, producing the order updates both legs generate.
    pub fn ingest_trades(&mut self, trades: Vec<Trade>) -> Result<Vec<Order>, XchangeError> {
        let mut updates = Vec::new();
        for trade in trades {
            self.latest_trade = Some(LatestTrade {
                price: trade.price,
                side: trade.side,
                time: trade.time,
            });

            for mut touched in self.book.touch(trade.side, trade.price, true) {
                let fill_size = touched.remaining_size();
                let maker_trade = Trade {
                    id: format!("{}-maker", trade.id).into(),
                    market_symbol: trade.market_symbol.clone(),
                    time: trade.time,
                    price: trade.price,
                    size: fill_size,
                    side: touched.parameters.side,
                    actor: Actor::Maker,
                    fee: Some(Fee::from_rate(
                        -self.fees.maker_fee,
                        self.market.value_of(fill_size, trade.price),
                    )),
                };
                ingest_trade(&mut touched, &maker_trade, &self.market)?;
                let (_, balance_change) = self.positions.ingest_trade(&maker_trade, &self.market);
                self.settle(&maker_trade, balance_change);
                self.orders.insert(touched.id.clone(), touched.clone());
                updates.push(touched);
            }

            let mut remaining = trade.size;
            let queue = self.taker_queue_mut(trade.side);
            while remaining > Decimal::ZERO {
                let Some(id) = queue.front().cloned() else {
                    break;
                };
                let Some(order) = self.orders.get_mut(&id) else {
                    queue.pop_front();
                    continue;
                };
                let fill_size = order.remaining_size().min(remaining);
                if fill_size <= Decimal::ZERO {
                    queue.pop_front();
                    continue;
                }
                let taker_trade = Trade {
                    id: format!("{}-taker-{id}", trade.id).into(),
                    market_symbol: trade.market_symbol.clone(),
                    time: trade.time,
                    price: trade.price,
                    size: fill_size,
                    side: order.parameters.side,
                    actor: Actor::Taker,
                    fee: Some(Fee::from_rate(
                        -self.fees.taker_fee,
                        self.market.value_of(fill_size, trade.price),
                    )),
                };
                ingest_trade(order, &taker_trade, &self.market)?;
                let (_, balance_change) = self.positions.ingest_trade(&taker_trade, &self.market);
                self.settle(&taker_trade, balance_change);
                remaining -= fill_size;
                let terminal = order.execution.status.is_terminal();
                updates.push(order.clone());
                if terminal {
                    queue.pop_front();
                }
            }

            self.positions.mark(&trade.market_symbol, trade.price, &self.market);
        }
        Ok(updates)
    }
}

fn dummy_params() -> OrderParameters {
    OrderParameters {
        size: Decimal::ZERO,
        side: Side::Buy,
        actor: None,
        price: None,
        time_in_force: crate::domain::TimeInForce::GoodTilCancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketDirection, TimeInForce};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market::new("BTCUSDT", "BTC", "USDT", MarketDirection::Linear, dec!(0.01), dec!(0.001))
    }

    fn fees() -> FeeSchedule {
        FeeSchedule {
            maker_fee: dec!(0.0001),
            taker_fee: dec!(0.0005),
        }
    }

    fn seed_latest_trade(sim: &mut Simulator, price: Decimal, side: Side) {
        sim.latest_trade = Some(LatestTrade {
            price,
            side,
            time: DateTime::UNIX_EPOCH,
        });
    }

    #[test]
    fn maker_fill_scenario() {
        let mut sim = Simulator::new(market(), fees());
        seed_latest_trade(&mut sim, dec!(100), Side::Buy);

        let opened = sim.open_orders(vec![(
            "m1".into(),
            OrderParameters {
                size: dec!(2),
                side: Side::Sell,
                actor: Some(Actor::Maker),
                price: Some(dec!(101)),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        )]);
        assert_eq!(opened[0].execution.status, OrderStatus::Created);

        let trade = Trade {
            id: "t1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price: dec!(101),
            size: dec!(3),
            side: Side::Buy,
            actor: Actor::Taker,
            fee: None,
        };
        let updates = sim.ingest_trades(vec![trade]).unwrap();
        let maker_update = updates.iter().find(|o| o.id == "m1").unwrap();
        assert_eq!(maker_update.execution.status, OrderStatus::Filled);
        assert_eq!(maker_update.execution.filled_size, dec!(2));
        assert_eq!(
            maker_update.execution.fee.clone().unwrap().balance_change,
            -(dec!(2) * dec!(101) * dec!(0.0001))
        );
    }

    #[test]
    fn taker_queue_fills_fifo_and_splits_large_trades() {
        let mut sim = Simulator::new(market(), fees());
        sim.open_orders(vec![(
            "t1".into(),
            OrderParameters {
                size: dec!(1),
                side: Side::Buy,
                actor: Some(Actor::Taker),
                price: None,
                time_in_force: TimeInForce::ImmediateOrCancel,
            },
        )]);
        sim.open_orders(vec![(
            "t2".into(),
            OrderParameters {
                size: dec!(1),
                side: Side::Buy,
                actor: Some(Actor::Taker),
                price: None,
                time_in_force: TimeInForce::ImmediateOrCancel,
            },
        )]);

        let trade = Trade {
            id: "print1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price: dec!(100),
            size: dec!(1.5),
            side: Side::Sell,
            actor: Actor::Maker,
            fee: None,
        };
        let updates = sim.ingest_trades(vec![trade]).unwrap();
        let t1 = updates.iter().rev().find(|o| o.id == "t1").unwrap();
        let t2 = updates.iter().rev().find(|o| o.id == "t2").unwrap();
        assert_eq!(t1.execution.status, OrderStatus::Filled);
        assert_eq!(t1.execution.filled_size, dec!(1));
        assert_eq!(t2.execution.status, OrderStatus::PartiallyFilled);
        assert_eq!(t2.execution.filled_size, dec!(0.5));
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let mut sim = Simulator::new(market(), fees());
        let params = OrderParameters {
            size: dec!(1),
            side: Side::Buy,
            actor: Some(Actor::Taker),
            price: None,
            time_in_force: TimeInForce::ImmediateOrCancel,
        };
        sim.open_orders(vec![("dup".into(), params.clone())]);
        let second = sim.open_orders(vec![("dup".into(), params)]);
        assert_eq!(second[0].execution.status, OrderStatus::Rejected);
    }

    #[test]
    fn maker_fill_opens_and_marks_the_simulators_position() {
        let mut sim = Simulator::new(market(), fees());
        seed_latest_trade(&mut sim, dec!(100), Side::Buy);

        sim.open_orders(vec![(
            "m1".into(),
            OrderParameters {
                size: dec!(2),
                side: Side::Sell,
                actor: Some(Actor::Maker),
                price: Some(dec!(101)),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        )]);
        let trade = Trade {
            id: "t1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price: dec!(101),
            size: dec!(3),
            side: Side::Buy,
            actor: Actor::Taker,
            fee: None,
        };
        sim.ingest_trades(vec![trade]).unwrap();

        let position = sim.position().expect("fill should have opened a position");
        let entry = position.entry.expect("short entry from the maker sell fill");
        assert_eq!(entry.side, Side::Sell);
        assert_eq!(entry.size, dec!(2));
        let performance = position.performance.expect("mark should have run after the print");
        assert_eq!(performance.mark_price, dec!(101));
    }

    #[test]
    fn maker_fill_settles_value_and_fee_into_the_quote_asset_balance() {
        let mut sim = Simulator::new(market(), fees());
        seed_latest_trade(&mut sim, dec!(100), Side::Buy);

        sim.open_orders(vec![(
            "m1".into(),
            OrderParameters {
                size: dec!(2),
                side: Side::Sell,
                actor: Some(Actor::Maker),
                price: Some(dec!(101)),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        )]);
        let trade = Trade {
            id: "t1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price: dec!(101),
            size: dec!(3),
            side: Side::Buy,
            actor: Actor::Taker,
            fee: None,
        };
        sim.ingest_trades(vec![trade]).unwrap();

        // Opening a short of size 2 at 101 pays out -value, then the maker
        // fee (0.01% of the fill's notional) is deducted on top.
        let balance = sim.balance("USDT").expect("a fill should have settled into USDT");
        let expected = -(dec!(2) * dec!(101)) - (dec!(2) * dec!(101) * dec!(0.0001));
        assert_eq!(balance.total, expected);
        assert_eq!(balance.free, expected);
    }
}
