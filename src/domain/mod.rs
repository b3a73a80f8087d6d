//! The trading domain model: markets, transactions, trades, fees, balances,
//! orders, positions, candles and the market-data order book.

pub mod balance;
pub mod candle;
pub mod fee;
pub mod market;
pub mod order;
pub mod orderbook;
pub mod position;
pub mod trade;
pub mod transaction;

pub use balance::{AssetBalance, Balance};
pub use candle::Candle;
pub use fee::Fee;
pub use market::{Market, MarketDirection};
pub use order::{
    CancellationStatus, Order, OrderExecution, OrderParameters, OrderStatus, TimeInForce,
};
pub use orderbook::{BookRow, Orderbook};
pub use position::{Position, PositionEntry, PositionPerformance};
pub use trade::Trade;
pub use transaction::{Actor, Side, Transaction};
