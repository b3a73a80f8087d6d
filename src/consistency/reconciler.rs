//! Reconciliation of out-of-order, duplicated, or partial venue updates
//! against locally-known order state.

use smol_str::SmolStr;

use crate::collection::{FnvIndexMap, FnvIndexSet};
use crate::domain::{CancellationStatus, Market, Order, OrderExecution, Trade};
use crate::error::XchangeError;

use super::order_state::ingest_trade;

/// An incoming venue update: a trade to ingest, a forward execution snapshot,
/// and/or a cancellation outcome. All three are optional and independent.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub trade: Option<Trade>,
    pub execution: Option<OrderExecution>,
    pub cancellation: Option<CancellationStatus>,
}

/// An [`Order`] augmented with the bookkeeping the reconciler needs: which
/// trade ids have already been folded in locally, and the most forward
/// execution snapshot the venue has reported.
#[derive(Debug, Clone)]
pub struct ReconciledOrder {
    pub order: Order,
    pub ingested_trade_ids: FnvIndexSet<SmolStr>,
    pub remote_execution: Option<OrderExecution>,
}

impl ReconciledOrder {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            ingested_trade_ids: FnvIndexSet::default(),
            remote_execution: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    orders: FnvIndexMap<SmolStr, ReconciledOrder>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, order: Order) {
        self.orders.insert(order.id.clone(), ReconciledOrder::new(order));
    }

    pub fn get(&self, id: &str) -> Option<&ReconciledOrder> {
        self.orders.get(id)
    }

    /// Applies one venue update to the tracked order, per the reconciliation
    /// algorithm: ingest any new trade, adopt a more-forward execution
    /// snapshot as the remote truth, and only propagate that snapshot's
    /// status locally once the locally-known fill size catches up with it.
    pub fn apply_update(
        &mut self,
        id: &str,
        update: OrderUpdate,
        market: &Market,
    ) -> Result<(), XchangeError> {
        let tracked = self
            .orders
            .get_mut(id)
            .ok_or_else(|| XchangeError::NotFound(format!("order {id} not tracked by reconciler")))?;

        if let Some(trade) = &update.trade {
            if !tracked.ingested_trade_ids.contains(trade.id.as_str()) {
                ingest_trade(&mut tracked.order, trade, market)?;
                tracked.ingested_trade_ids.insert(trade.id.clone());
            }
        }

        if let Some(remote) = update.execution {
            let is_forward = tracked
                .remote_execution
                .as_ref()
                .map(|current| current.is_forward_of(&remote))
                .unwrap_or(true);
            if is_forward {
                tracked.remote_execution = Some(remote);
            }
        }

        if let Some(remote) = tracked.remote_execution.clone() {
            if tracked.order.execution.status.can_transition_to(remote.status)
                && remote.filled_size == tracked.order.execution.filled_size
            {
                tracked.order.execution.status = remote.status;
            }
        }

        if let Some(cancellation) = update.cancellation {
            let adopt = tracked
                .order
                .cancellation
                .map(|current| current.can_transition_to(cancellation))
                .unwrap_or(true);
            if adopt {
                tracked.order.cancellation = Some(cancellation);
            }
        }

        Ok(())
    }

    /// Orders where the venue is reporting more fills than we've locally
    /// ingested (a missing trade), or where local and remote state have
    /// diverged beyond repair.
    pub fn out_of_sync_orders(&self) -> Vec<&ReconciledOrder> {
        self.orders
            .values()
            .filter(|tracked| match &tracked.remote_execution {
                Some(remote) => {
                    remote.filled_size > tracked.order.execution.filled_size
                        || tracked.order.execution.diverged_from(remote)
                }
                None => false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Actor, MarketDirection, OrderParameters, OrderStatus, Side, TimeInForce};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market::new("BTCUSDT", "BTC", "USDT", MarketDirection::Linear, dec!(0.01), dec!(0.001))
    }

    fn open_order() -> Order {
        Order::new(
            "o1",
            "BTCUSDT",
            OrderParameters {
                size: dec!(2),
                side: Side::Buy,
                actor: Some(Actor::Maker),
                price: Some(dec!(101)),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        )
    }

    #[test]
    fn missing_trade_surfaces_as_out_of_sync_until_it_arrives() {
        let market = market();
        let mut reconciler = Reconciler::new();
        reconciler.track(open_order());

        let mut remote = OrderExecution::new_in_flight(Side::Buy);
        remote.status = OrderStatus::PartiallyFilled;
        remote.filled_size = dec!(1);

        reconciler
            .apply_update(
                "o1",
                OrderUpdate {
                    trade: None,
                    execution: Some(remote),
                    cancellation: None,
                },
                &market,
            )
            .unwrap();

        assert_eq!(reconciler.get("o1").unwrap().order.execution.status, OrderStatus::InFlight);
        assert_eq!(reconciler.out_of_sync_orders().len(), 1);

        let trade = Trade {
            id: "t1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price: dec!(101),
            size: dec!(1),
            side: Side::Buy,
            actor: Actor::Maker,
            fee: None,
        };
        reconciler
            .apply_update(
                "o1",
                OrderUpdate {
                    trade: Some(trade),
                    execution: None,
                    cancellation: None,
                },
                &market,
            )
            .unwrap();

        assert_eq!(
            reconciler.get("o1").unwrap().order.execution.status,
            OrderStatus::PartiallyFilled
        );
        assert!(reconciler.out_of_sync_orders().is_empty());
    }

    #[test]
    fn duplicate_trade_id_is_ingested_once() {
        let market = market();
        let mut reconciler = Reconciler::new();
        reconciler.track(open_order());

        let trade = Trade {
            id: "t1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price: dec!(101),
            size: dec!(1),
            side: Side::Buy,
            actor: Actor::Maker,
            fee: None,
        };

        for _ in 0..2 {
            reconciler
                .apply_update(
                    "o1",
                    OrderUpdate {
                        trade: Some(trade.clone()),
                        execution: None,
                        cancellation: None,
                    },
                    &market,
                )
                .unwrap();
        }

        assert_eq!(reconciler.get("o1").unwrap().order.execution.filled_size, dec!(1));
    }
}
