//! Crate-wide error taxonomy.
//!
//! `XchangeError` aggregates the stable category symbols described by the
//! error handling design: `fault`, `incorrect` (with `unsupported`,
//! `not_found`, `invalid_params`, `unauthorized` children) and `connection`
//! (with `timeout`, `unavailable`, `busy`, `rate_limited`, `outdated`
//! children). Most fallible operations in this crate return a value carrying
//! its own status rather than a bare `Result` (see `domain::order`), but
//! anywhere a `Result` is the right shape this is the error type to use.

use thiserror::Error;

/// A stable, matchable error category, independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Fault,
    Unsupported,
    NotFound,
    InvalidParams,
    Unauthorized,
    Timeout,
    Unavailable,
    Busy,
    RateLimited,
    Outdated,
}

impl ErrorCategory {
    /// `forbidden` is not a distinct category; alias it to `unauthorized`.
    pub const fn forbidden() -> Self {
        Self::Unauthorized
    }

    /// `interrupted` is not a distinct category; alias it to `fault`.
    pub const fn interrupted() -> Self {
        Self::Fault
    }
}

#[derive(Debug, Clone, Error)]
pub enum XchangeError {
    #[error("fault: {0}")]
    Fault(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("connection timeout: {0}")]
    Timeout(String),

    #[error("connection unavailable: {0}")]
    Unavailable(String),

    #[error("busy: {0}")]
    Busy(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("outdated: {0}")]
    Outdated(String),

    #[error("receiver side of a channel was dropped")]
    RxDropped(#[from] RxDropped),

    #[error("task join failed: {0}")]
    JoinError(String),
}

impl XchangeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fault(_) | Self::RxDropped(_) | Self::JoinError(_) => ErrorCategory::Fault,
            Self::Unsupported(_) => ErrorCategory::Unsupported,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::InvalidParams(_) => ErrorCategory::InvalidParams,
            Self::Unauthorized(_) => ErrorCategory::Unauthorized,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Unavailable(_) => ErrorCategory::Unavailable,
            Self::Busy(_) => ErrorCategory::Busy,
            Self::RateLimited(_) => ErrorCategory::RateLimited,
            Self::Outdated(_) => ErrorCategory::Outdated,
        }
    }
}

/// Signals that the receiver side of a channel was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("RxDropped")]
pub struct RxDropped;

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RxDropped {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for XchangeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::RxDropped(RxDropped)
    }
}

impl From<tokio::task::JoinError> for XchangeError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}
