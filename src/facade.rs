//! Capability-typed external interfaces. Collaborators (exchange adapters,
//! simulators, historical-data backends) implement whichever subset of these
//! traits they can support; nothing here assumes a single all-capable client.
//!
//! Grounded on the broker capability split (`MarketDataProvider` /
//! `OrderExecutor` / `AccountProvider`, each its own `#[async_trait]`): one
//! trait per capability rather than one monolithic client trait.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Balance, Candle, Order, OrderParameters, Orderbook, Position, Trade};
use crate::error::XchangeError;
use crate::shutdown::AsyncShutdown;

/// Returned by every `Stream*` subscription. Dropping it without calling
/// [`AsyncShutdown::shutdown`] leaves the underlying task running; callers
/// that need deterministic teardown should always shut it down explicitly.
pub struct StreamHandle {
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl StreamHandle {
    pub fn new(stop_tx: tokio::sync::oneshot::Sender<()>, task: tokio::task::JoinHandle<()>) -> Self {
        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

impl AsyncShutdown for StreamHandle {
    type Result = ();

    async fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Order placement, cancellation, and lookup.
#[async_trait]
pub trait OrderExecution {
    async fn open(&self, params: OrderParameters) -> Order;
    async fn cancel(&self, order_id: &str) -> Result<(), XchangeError>;
    async fn get(&self, order_id: &str) -> Result<Order, XchangeError>;
    async fn get_trades(&self, order_id: &str) -> Result<Vec<Trade>, XchangeError>;
}

#[async_trait]
pub trait GetCandles {
    async fn get_candles(&self, market_symbol: &str, timeframe: &str) -> Result<Vec<Candle>, XchangeError>;
}

#[async_trait]
pub trait GetOrderbook {
    async fn get_orderbook(&self, market_symbol: &str) -> Result<Orderbook, XchangeError>;
}

#[async_trait]
pub trait StreamCandles {
    async fn stream_candles(
        &self,
        market_symbol: &str,
        timeframe: &str,
        output: mpsc::Sender<Candle>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[async_trait]
pub trait StreamOrderbook {
    async fn stream_orderbook(
        &self,
        market_symbol: &str,
        output: mpsc::Sender<Orderbook>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[async_trait]
pub trait StreamTrades {
    async fn stream_trades(
        &self,
        market_symbol: &str,
        output: mpsc::Sender<Trade>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[async_trait]
pub trait StreamOrderUpdates {
    async fn stream_order_updates(
        &self,
        output: mpsc::Sender<Order>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[async_trait]
pub trait StreamPositions {
    async fn stream_positions(
        &self,
        output: mpsc::Sender<Position>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[async_trait]
pub trait StreamBalances {
    async fn stream_balances(
        &self,
        output: mpsc::Sender<Balance>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[async_trait]
pub trait StreamHistoricalTrades {
    async fn stream_historical_trades(
        &self,
        market_symbol: &str,
        from_exclusive: Option<&str>,
        output: mpsc::Sender<Trade>,
        close_on_stop: bool,
    ) -> Result<StreamHandle, XchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_handle_shutdown_signals_stop_and_awaits_task() {
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = stop_rx.await;
        });
        let mut handle = StreamHandle::new(stop_tx, task);
        handle.shutdown().await;
        assert!(handle.stop_tx.is_none());
        assert!(handle.task.is_none());
    }
}
