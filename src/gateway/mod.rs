//! Venue gateway abstraction.
//!
//! [`ExchangeGateway`] is the capability surface trading logic programs
//! against: market data, account state, and the order lifecycle, all in
//! normalized types. One implementor per venue; [`binance`] is the
//! reference implementation.

pub mod binance;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::Venue;
use crate::domain::{
    Balance, Candle, Order, OrderBook, OrderSide, OrderType, Position, PositionMode, SymbolInfo,
    Ticker, TimeInForce,
};
use crate::error::{ExchangeError, Result};

/// Default number of candles returned by `get_ohlc`.
pub const OHLC_DEFAULT_LIMIT: u32 = 500;

/// Hard ceiling on one `get_ohlc` page; larger requests are clamped.
pub const OHLC_MAX_LIMIT: u32 = 1500;

/// Order book depths the venue serves.
pub const ORDERBOOK_DEPTHS: &[u32] = &[5, 10, 20, 50, 100, 500, 1000];

/// A new order to submit, in normalized terms.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub client_order_id: Option<String>,
    pub reduce_only: bool,
}

impl NewOrder {
    /// A GTC limit order.
    #[must_use]
    pub fn limit(symbol: impl Into<String>, side: OrderSide, qty: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            qty,
            price: Some(price),
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            client_order_id: None,
            reduce_only: false,
        }
    }

    /// A market order.
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: OrderSide, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            qty,
            price: None,
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            client_order_id: None,
            reduce_only: false,
        }
    }

    #[must_use]
    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    #[must_use]
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Check the argument rules that vary by order type, before anything
    /// touches the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidOrder`] when a required price or
    /// stop price is missing, or the quantity is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.qty <= Decimal::ZERO {
            return Err(ExchangeError::InvalidOrder(format!(
                "qty must be positive, got {}",
                self.qty
            )));
        }
        if self.order_type.requires_price() && self.price.is_none() {
            return Err(ExchangeError::InvalidOrder(format!(
                "price required for {} orders",
                self.order_type
            )));
        }
        if self.order_type.requires_stop_price() && self.stop_price.is_none() {
            return Err(ExchangeError::InvalidOrder(format!(
                "stop price required for {} orders",
                self.order_type
            )));
        }
        Ok(())
    }
}

/// Identifies an existing order by venue id or client id.
///
/// The venue accepts either; exactly one must be present. When both are
/// set, the venue id wins.
#[derive(Debug, Clone, Default)]
pub struct OrderSelector {
    pub order_id: Option<String>,
    pub client_order_id: Option<String>,
}

impl OrderSelector {
    #[must_use]
    pub fn by_id(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            client_order_id: None,
        }
    }

    #[must_use]
    pub fn by_client_id(client_order_id: impl Into<String>) -> Self {
        Self {
            order_id: None,
            client_order_id: Some(client_order_id.into()),
        }
    }

    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidOrder`] when neither identifier is
    /// supplied.
    pub fn validate(&self) -> Result<()> {
        if self.order_id.is_none() && self.client_order_id.is_none() {
            return Err(ExchangeError::InvalidOrder(
                "either order_id or client_order_id required".into(),
            ));
        }
        Ok(())
    }
}

/// Uniform REST surface over one venue.
///
/// Implementations own their HTTP resources, consult the venue's shared
/// rate limiter on every call, and translate raw venue errors into the
/// [`ExchangeError`] taxonomy.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    fn venue(&self) -> Venue;

    /// Trading constraints for one symbol. Fails with
    /// [`ExchangeError::InvalidOrder`] when the venue does not list it.
    async fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo>;

    /// Closed candles for `symbol`/`interval`, newest last. `limit`
    /// defaults to [`OHLC_DEFAULT_LIMIT`] and is clamped to
    /// [`OHLC_MAX_LIMIT`].
    async fn get_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<Candle>>;

    /// 24-hour ticker with current best bid/ask.
    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker>;

    /// Order book snapshot at one of [`ORDERBOOK_DEPTHS`].
    async fn get_orderbook(&self, symbol: &str, depth: u32) -> Result<OrderBook>;

    /// Non-zero balances.
    async fn get_balances(&self) -> Result<Vec<Balance>>;

    /// Open (non-zero quantity) positions.
    async fn get_positions(&self) -> Result<Vec<Position>>;

    async fn get_position_mode(&self) -> Result<PositionMode>;

    async fn set_position_mode(&self, mode: PositionMode) -> Result<()>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;

    /// Submit a new order. Validates locally first: argument errors never
    /// reach the wire.
    async fn submit_order(&self, order: NewOrder) -> Result<Order>;

    /// Replace an order's quantity and/or price, returning the new order
    /// record. See the venue implementation for its atomicity caveats.
    async fn modify_order(
        &self,
        symbol: &str,
        order_id: &str,
        qty: Option<Decimal>,
        price: Option<Decimal>,
    ) -> Result<Order>;

    async fn cancel_order(&self, symbol: &str, selector: OrderSelector) -> Result<()>;

    /// Open orders, optionally filtered by symbol.
    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>>;

    async fn get_order_status(&self, symbol: &str, selector: OrderSelector) -> Result<Order>;
}
