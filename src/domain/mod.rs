//! Venue-agnostic data model.
//!
//! Every monetary and quantity field is a [`rust_decimal::Decimal`];
//! floating point never touches prices, quantities, or PnL. Timestamps
//! are UTC instants at millisecond resolution. Models are plain value
//! records: they cross component boundaries by clone, never by shared
//! mutation.

mod account;
mod market;
mod order;
pub mod symbol;

pub use account::{
    AccountBalance, AccountPosition, AccountUpdate, Balance, Position, PositionMode, PositionSide,
};
pub use market::{Candle, OrderBook, PriceLevel, SymbolInfo, Ticker, Trade};
pub use order::{Order, OrderSide, OrderStatus, OrderType, TimeInForce};
