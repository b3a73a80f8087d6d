//! A self-healing WebSocket connection: a single-writer state machine that
//! owns the socket handle, retries with backoff, and monitors liveness with
//! ping/pong.
//!
//! All state transitions are serialized through one command queue consumed
//! by a single worker task, the async equivalent of the agent-serialized
//! state machine this module is grounded on. External callers submit
//! commands and may await completion via a one-shot channel; callbacks run
//! on the worker task and are closed over a connection token so a callback
//! from a socket that's since been superseded is a silent no-op.
//!
//! Liveness: the keep-alive task pings on `ping_interval` and marks a pong
//! pending; if none arrives within `pong_ack_timeout` it forces a
//! `Terminate`. Terminating rotates the connection token (so the superseded
//! reader/keep-alive tasks stop acting on it), closes the socket within
//! `abort_grace`, and schedules a retry whose backoff uses a consecutive
//! attempt counter — incremented on every failed connect or terminate, reset
//! the moment a message is received on a live connection.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::XchangeError;
use crate::shutdown::AsyncShutdown;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds the connection URL fresh on every dial attempt (allowing
/// re-signing of short-lived auth query params).
pub type UrlFn = Arc<dyn Fn() -> Url + Send + Sync>;
/// Computes the retry backoff for attempt `n` (1-indexed).
pub type RetryDelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;
pub type OnMessage = Arc<dyn Fn(Message) + Send + Sync>;
pub type OnConnectionError = Arc<dyn Fn(&str) + Send + Sync>;
pub type OnNewConnection = Arc<dyn Fn() + Send + Sync>;

/// Exponential backoff between reconnect attempts, capped at `backoff_max`.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectionBackoffPolicy {
    pub backoff_initial: Duration,
    pub backoff_multiplier: u32,
    pub backoff_max: Duration,
}

/// Matches the teacher's default stream reconnection cadence: 125ms initial,
/// doubling, capped at 60s.
pub const DEFAULT_RECONNECTION_POLICY: ReconnectionBackoffPolicy = ReconnectionBackoffPolicy {
    backoff_initial: Duration::from_millis(125),
    backoff_multiplier: 2,
    backoff_max: Duration::from_secs(60),
};

impl ReconnectionBackoffPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1).min(32);
        let scaled = self.backoff_initial.saturating_mul(self.backoff_multiplier.saturating_pow(attempt - 1));
        scaled.min(self.backoff_max)
    }

    pub fn into_retry_delay_fn(self) -> RetryDelayFn {
        Arc::new(move |attempt| self.delay_for(attempt))
    }
}

#[derive(Clone)]
pub struct ResilientWebSocketConfig {
    pub url_fn: UrlFn,
    pub retry_delay_fn: RetryDelayFn,
    pub ping_interval: Duration,
    pub pong_ack_timeout: Duration,
    pub abort_grace: Duration,
    pub on_new_connection: OnNewConnection,
    pub on_message: OnMessage,
    pub on_connection_error: OnConnectionError,
}

enum Command {
    Connect,
    Retry(u32),
    Send(Message, oneshot::Sender<Result<(), XchangeError>>),
    Terminate,
    Close(oneshot::Sender<()>),
}

struct SharedState {
    token: AtomicU64,
    closed: AtomicBool,
    /// Consecutive failed-connect/terminate count, driving backoff; reset to
    /// 0 the moment a message is received on a live connection.
    attempt: AtomicU32,
}

/// A handle to the running connection worker. Cloning shares the same
/// underlying command queue.
#[derive(Clone)]
pub struct ResilientWebSocket {
    commands: mpsc::Sender<Command>,
}

impl ResilientWebSocket {
    pub fn spawn(config: ResilientWebSocketConfig) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let shared = Arc::new(SharedState {
            token: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            attempt: AtomicU32::new(0),
        });
        tokio::spawn(run(config, rx, tx.clone(), shared));
        let handle = Self { commands: tx };
        let _ = handle.commands.try_send(Command::Connect);
        handle
    }

    /// Sends a message over the current socket, suspending until it is
    /// accepted (or fails) rather than silently dropping it.
    pub async fn send(&self, message: Message) -> Result<(), XchangeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Send(message, tx))
            .await
            .map_err(XchangeError::from)?;
        rx.await.map_err(|_| XchangeError::Unavailable("worker dropped".into()))?
    }
}

impl AsyncShutdown for ResilientWebSocket {
    type Result = ();

    /// Flips closed, issues a terminate, and waits for the worker to
    /// confirm the socket is down before returning.
    async fn shutdown(&mut self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Close(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

async fn run(
    config: ResilientWebSocketConfig,
    mut commands: mpsc::Receiver<Command>,
    self_tx: mpsc::Sender<Command>,
    shared: Arc<SharedState>,
) {
    let socket: Arc<Mutex<Option<Socket>>> = Arc::new(Mutex::new(None));
    let pending_pong = Arc::new(AtomicBool::new(false));

    while let Some(command) = commands.recv().await {
        match command {
            Command::Connect => {
                if shared.closed.load(Ordering::SeqCst) || socket.lock().await.is_some() {
                    continue;
                }
                let my_token = shared.token.fetch_add(1, Ordering::SeqCst) + 1;
                let url = (config.url_fn)();
                match connect_async(url.as_str()).await {
                    Ok((stream, _response)) => {
                        *socket.lock().await = Some(stream);
                        (config.on_new_connection)();
                        spawn_reader(
                            socket.clone(),
                            config.clone(),
                            self_tx.clone(),
                            shared.clone(),
                            pending_pong.clone(),
                            my_token,
                        );
                        spawn_keep_alive(
                            self_tx.clone(),
                            shared.clone(),
                            pending_pong.clone(),
                            my_token,
                            config.ping_interval,
                            config.pong_ack_timeout,
                        );
                    }
                    Err(err) => {
                        (config.on_connection_error)(&err.to_string());
                        let attempt = shared.attempt.fetch_add(1, Ordering::SeqCst) + 1;
                        let _ = self_tx.send(Command::Retry(attempt)).await;
                    }
                }
            }
            Command::Retry(attempt) => {
                if shared.closed.load(Ordering::SeqCst) {
                    continue;
                }
                let delay = (config.retry_delay_fn)(attempt);
                let self_tx = self_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = self_tx.send(Command::Connect).await;
                });
            }
            Command::Send(message, ack) => {
                let mut guard = socket.lock().await;
                let result = match guard.as_mut() {
                    Some(stream) => stream
                        .send(message)
                        .await
                        .map_err(|err| XchangeError::Unavailable(err.to_string())),
                    None => Err(XchangeError::Unavailable("not connected".into())),
                };
                let _ = ack.send(result);
            }
            Command::Terminate => {
                // Rotate the token first so the reader and keep-alive tasks
                // for this generation stop acting on it immediately, rather
                // than racing the next successful `Connect`.
                shared.token.fetch_add(1, Ordering::SeqCst);
                if let Some(mut stream) = socket.lock().await.take() {
                    let _ = tokio::time::timeout(config.abort_grace, stream.close(None)).await;
                }
                if !shared.closed.load(Ordering::SeqCst) {
                    let attempt = shared.attempt.fetch_add(1, Ordering::SeqCst) + 1;
                    let _ = self_tx.send(Command::Retry(attempt)).await;
                }
            }
            Command::Close(done) => {
                shared.closed.store(true, Ordering::SeqCst);
                if let Some(mut stream) = socket.lock().await.take() {
                    let _ = stream.close(None).await;
                }
                let _ = done.send(());
                return;
            }
        }
    }
}

fn spawn_reader(
    socket: Arc<Mutex<Option<Socket>>>,
    config: ResilientWebSocketConfig,
    self_tx: mpsc::Sender<Command>,
    shared: Arc<SharedState>,
    pending_pong: Arc<AtomicBool>,
    token: u64,
) {
    tokio::spawn(async move {
        loop {
            let next = {
                let mut guard = socket.lock().await;
                match guard.as_mut() {
                    Some(stream) => stream.next().await,
                    None => return,
                }
            };
            if shared.token.load(Ordering::SeqCst) != token {
                return;
            }
            match next {
                Some(Ok(Message::Pong(_))) => {
                    pending_pong.store(false, Ordering::SeqCst);
                    shared.attempt.store(0, Ordering::SeqCst);
                }
                Some(Ok(message)) => {
                    shared.attempt.store(0, Ordering::SeqCst);
                    (config.on_message)(message);
                }
                Some(Err(err)) => {
                    (config.on_connection_error)(&err.to_string());
                    let _ = self_tx.send(Command::Terminate).await;
                    return;
                }
                None => {
                    let _ = self_tx.send(Command::Terminate).await;
                    return;
                }
            }
        }
    });
}

/// Pings on `ping_interval` and, if no pong arrives within `pong_ack_timeout`
/// of the ping going out, forces the connection down via `Terminate`.
fn spawn_keep_alive(
    self_tx: mpsc::Sender<Command>,
    shared: Arc<SharedState>,
    pending_pong: Arc<AtomicBool>,
    token: u64,
    ping_interval: Duration,
    pong_ack_timeout: Duration,
) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ping_interval).await;
            if shared.token.load(Ordering::SeqCst) != token || shared.closed.load(Ordering::SeqCst) {
                return;
            }
            pending_pong.store(true, Ordering::SeqCst);
            let (ack_tx, ack_rx) = oneshot::channel();
            if self_tx
                .send(Command::Send(Message::Ping(Vec::new().into()), ack_tx))
                .await
                .is_err()
            {
                return;
            }
            let _ = ack_rx.await;

            tokio::time::sleep(pong_ack_timeout).await;
            if shared.token.load(Ordering::SeqCst) != token || shared.closed.load(Ordering::SeqCst) {
                return;
            }
            if pending_pong.load(Ordering::SeqCst) {
                let _ = self_tx.send(Command::Terminate).await;
                return;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_closures_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResilientWebSocketConfig>();
    }

    #[test]
    fn backoff_doubles_and_then_caps() {
        assert_eq!(DEFAULT_RECONNECTION_POLICY.delay_for(1), Duration::from_millis(125));
        assert_eq!(DEFAULT_RECONNECTION_POLICY.delay_for(2), Duration::from_millis(250));
        assert_eq!(DEFAULT_RECONNECTION_POLICY.delay_for(20), Duration::from_secs(60));
    }
}
