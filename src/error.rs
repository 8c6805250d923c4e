//! Error taxonomy shared by the gateway, streams, and OMS.
//!
//! Kinds are flat and venue-agnostic: callers match on what went wrong,
//! not on which venue produced it. Retry eligibility is a property of the
//! kind, exposed through [`ExchangeError::is_transient`].

use thiserror::Error;

use crate::domain::OrderStatus;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Temporary venue fault (5xx-class, timestamp drift, signature clock
    /// skew). Eligible for bounded retry at the REST boundary.
    #[error("transient venue error: {message} (code {code})")]
    Transient { message: String, code: i64 },

    /// Venue rejected an invariant we cannot fix by retrying.
    #[error("permanent venue error: {message} (code {code})")]
    Permanent { message: String, code: i64 },

    /// Venue rate ceiling hit (-1003). The token buckets shape our own
    /// traffic; this kind means the venue disagreed anyway, and the caller
    /// owns the backoff.
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// Order validation failure, ours or the venue's.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Account cannot fund the order.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Transport failed to establish or dropped mid-call.
    #[error("connection error: {0}")]
    Connection(String),

    /// WebSocket protocol or frame-level error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// OMS state machine rejected a status transition.
    #[error("invalid order state transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Registry already tracks an order with this id.
    #[error("order {0} already tracked")]
    AlreadyExists(String),

    /// Cancel-then-submit modify lost its second half: the original order
    /// is gone and the replacement was rejected. Callers must treat the
    /// position as unprotected until they re-submit.
    #[error("order {canceled_order_id} canceled but replacement failed: {source}")]
    ModifyReplaceFailed {
        canceled_order_id: String,
        #[source]
        source: Box<ExchangeError>,
    },
}

impl ExchangeError {
    /// Whether the REST retry policy may re-attempt the call.
    ///
    /// Only [`Transient`](Self::Transient) qualifies; everything else
    /// short-circuits to the caller.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether the error came from the transport layer rather than the
    /// venue's application logic.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::WebSocket(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::Connection(e.to_string())
        } else {
            // Timeouts, resets mid-body, and decode hiccups are all worth
            // one more attempt.
            Self::Transient {
                message: e.to_string(),
                code: 0,
            }
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
