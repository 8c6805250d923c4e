//! venecto - exchange connectivity core for derivatives trading bots.
//!
//! Turns a remote crypto exchange (Binance USD-M Futures, with structural
//! room for other venues) into a stable, typed, event-driven facade:
//!
//! ```text
//! src/
//! ├── domain/      # Normalized models: symbols, candles, orders, positions
//! ├── config.rs    # Per-venue endpoints, rate ceilings, symbol formats
//! ├── error.rs     # Flat error taxonomy shared by every component
//! ├── limiter/     # Token-bucket rate limiting, shared per venue
//! ├── retry.rs     # Bounded retry for transient venue faults
//! ├── gateway/     # REST surface: market data, account, order lifecycle
//! ├── stream/      # WebSocket fan-in: reconnecting market + user streams
//! └── oms/         # Order registry, state machine, reconciler
//! ```
//!
//! Strategy code talks to [`gateway::ExchangeGateway`] for requests and
//! subscribes to [`stream`] events; the [`oms`] keeps the local order
//! view honest against the venue.
//!
//! Prices, quantities, and PnL are always [`rust_decimal::Decimal`];
//! binary floating point is banned from monetary values.

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod oms;
pub mod retry;
pub mod stream;

pub use config::Venue;
pub use error::{ExchangeError, Result};
