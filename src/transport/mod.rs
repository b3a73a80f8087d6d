//! Connection-layer primitives: a self-healing WebSocket and a topic-keyed
//! fan-out registry built on top of it.

pub mod fanout;
pub mod resilient_socket;

pub use fanout::{Fanout, SubscribeFn, Topic};
pub use resilient_socket::{
    OnConnectionError, OnMessage, OnNewConnection, ReconnectionBackoffPolicy, ResilientWebSocket,
    ResilientWebSocketConfig, RetryDelayFn, UrlFn, DEFAULT_RECONNECTION_POLICY,
};
