//! Graceful shutdown traits shared by pipeline nodes and the resilient socket.

use std::future::Future;

/// Components that can shut down immediately, without suspending.
pub trait SyncShutdown {
    type Result;
    fn shutdown(&mut self) -> Self::Result;
}

/// Components that need to perform async work (draining channels, awaiting
/// in-flight tasks) before they're fully shut down.
pub trait AsyncShutdown {
    type Result;
    fn shutdown(&mut self) -> impl Future<Output = Self::Result> + Send;
}

/// A shutdown signal that can be routed through a pipeline as an ordinary event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Shutdown;
