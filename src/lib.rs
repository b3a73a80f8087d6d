#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! Core event-flow pipeline, order/position consistency engine,
//! limit-order-book simulator and resilient WebSocket transport for a
//! cryptocurrency exchange trading toolkit.
//!
//! This crate is the exchange-agnostic core: it has no knowledge of any
//! particular venue's wire format. Adapters live elsewhere and implement the
//! capability traits in [`facade`] against the types in [`domain`].
//!
//! - [`domain`] — markets, orders, trades, positions, candles, the order book.
//! - [`consistency`] — ingesting fills into order/position state, and
//!   reconciling local state against a venue's authoritative view.
//! - [`simulator`] — a deterministic limit-order-book matching engine for
//!   backtesting and paper trading.
//! - [`pipeline`] — synchronous and asynchronous event-flow graphs.
//! - [`transport`] — a self-healing WebSocket connection and topic fan-out.
//! - [`facade`] — the capability-typed external interface collaborators implement.

pub mod collection;
pub mod consistency;
pub mod decimal;
pub mod domain;
pub mod error;
pub mod facade;
pub mod logging;
pub mod pipeline;
pub mod shutdown;
pub mod simulator;
pub mod transport;

pub use error::{ErrorCategory, RxDropped, XchangeError};
pub use shutdown::{AsyncShutdown, Shutdown, SyncShutdown};
