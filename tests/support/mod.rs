//! Shared test fixtures: a scripted mock gateway and order builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use venecto::config::Venue;
use venecto::domain::{
    Balance, Candle, Order, OrderBook, OrderSide, OrderStatus, OrderType, Position, PositionMode,
    SymbolInfo, Ticker, TimeInForce,
};
use venecto::error::{ExchangeError, Result};
use venecto::gateway::{ExchangeGateway, NewOrder, OrderSelector};

/// Build a plain GTC limit order record for tests.
pub fn limit_order(id: &str, client_id: &str, symbol: &str, status: OrderStatus) -> Order {
    Order {
        order_id: id.into(),
        client_order_id: client_id.into(),
        symbol: symbol.into(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        status,
        qty: dec!(0.002),
        executed_qty: dec!(0),
        price: Some(dec!(57000)),
        stop_price: None,
        avg_fill_price: dec!(0),
        commission: dec!(0),
        commission_asset: String::new(),
        time_in_force: TimeInForce::Gtc,
        updated_at: Utc::now(),
    }
}

/// Scripted in-memory gateway: tests preload venue-side state and assert
/// on the calls the code under test makes.
#[derive(Default)]
pub struct MockGateway {
    /// What `get_open_orders` reports, in insertion order.
    pub open_orders: Mutex<Vec<Order>>,
    /// Answers for `get_order_status`, keyed by order id.
    pub statuses: Mutex<HashMap<String, Order>>,
    /// Order ids canceled through this gateway.
    pub canceled: Mutex<Vec<String>>,
    /// Orders submitted through this gateway.
    pub submitted: Mutex<Vec<NewOrder>>,
    next_order_id: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            next_order_id: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    pub fn with_open_orders(orders: Vec<Order>) -> Self {
        let gateway = Self::new();
        *gateway.open_orders.lock() = orders;
        gateway
    }

    pub fn script_status(&self, order: Order) {
        self.statuses.lock().insert(order.order_id.clone(), order);
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo> {
        let (base, quote) = symbol
            .split_once('/')
            .ok_or_else(|| ExchangeError::InvalidOrder(format!("bad symbol {symbol}")))?;
        Ok(SymbolInfo {
            symbol: symbol.into(),
            base: base.into(),
            quote: quote.into(),
            min_qty: dec!(0.001),
            max_qty: dec!(1000),
            qty_step: dec!(0.001),
            min_price: dec!(0.1),
            max_price: dec!(1000000),
            price_step: dec!(0.1),
            min_notional: dec!(5),
            is_spot: false,
            is_futures: true,
            is_margin: false,
            is_trading: true,
        })
    }

    async fn get_ohlc(
        &self,
        _symbol: &str,
        _interval: &str,
        _start: Option<DateTime<Utc>>,
        _end: Option<DateTime<Utc>>,
        _limit: Option<u32>,
    ) -> Result<Vec<Candle>> {
        Ok(Vec::new())
    }

    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker> {
        Ok(Ticker {
            symbol: symbol.into(),
            last: dec!(60000),
            bid: dec!(59999.9),
            ask: dec!(60000.1),
            bid_qty: dec!(1),
            ask_qty: dec!(1),
            ts: Utc::now(),
        })
    }

    async fn get_orderbook(&self, symbol: &str, _depth: u32) -> Result<OrderBook> {
        Ok(OrderBook {
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            ts: Utc::now(),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Balance>> {
        Ok(Vec::new())
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        Ok(Vec::new())
    }

    async fn get_position_mode(&self) -> Result<PositionMode> {
        Ok(PositionMode::OneWay)
    }

    async fn set_position_mode(&self, _mode: PositionMode) -> Result<()> {
        Ok(())
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
        Ok(())
    }

    async fn submit_order(&self, order: NewOrder) -> Result<Order> {
        // Mirrors the real gateway contract: invalid arguments never
        // reach the wire, so they are not recorded as submissions.
        order.validate()?;
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push(order.clone());

        let record = Order {
            order_id: id.to_string(),
            client_order_id: order.client_order_id.clone().unwrap_or_default(),
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: order.order_type,
            status: OrderStatus::New,
            qty: order.qty,
            executed_qty: Decimal::ZERO,
            price: order.price,
            stop_price: order.stop_price,
            avg_fill_price: Decimal::ZERO,
            commission: Decimal::ZERO,
            commission_asset: String::new(),
            time_in_force: order.time_in_force,
            updated_at: Utc::now(),
        };
        self.open_orders.lock().push(record.clone());
        Ok(record)
    }

    async fn modify_order(
        &self,
        symbol: &str,
        order_id: &str,
        qty: Option<Decimal>,
        price: Option<Decimal>,
    ) -> Result<Order> {
        let current = self
            .get_order_status(symbol, OrderSelector::by_id(order_id))
            .await?;
        self.cancel_order(symbol, OrderSelector::by_id(order_id))
            .await?;
        self.submit_order(NewOrder {
            symbol: symbol.into(),
            side: current.side,
            order_type: current.order_type,
            qty: qty.unwrap_or(current.qty),
            price: price.or(current.price),
            stop_price: current.stop_price,
            time_in_force: current.time_in_force,
            client_order_id: None,
            reduce_only: false,
        })
        .await
    }

    async fn cancel_order(&self, _symbol: &str, selector: OrderSelector) -> Result<()> {
        selector.validate()?;
        let mut open = self.open_orders.lock();
        let before = open.len();
        open.retain(|o| {
            selector.order_id.as_deref() != Some(o.order_id.as_str())
                && selector.client_order_id.as_deref() != Some(o.client_order_id.as_str())
        });
        if open.len() == before {
            return Err(ExchangeError::InvalidOrder("unknown order".into()));
        }
        if let Some(id) = selector.order_id {
            self.canceled.lock().push(id);
        } else if let Some(id) = selector.client_order_id {
            self.canceled.lock().push(id);
        }
        Ok(())
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        Ok(self
            .open_orders
            .lock()
            .iter()
            .filter(|o| symbol.map_or(true, |s| o.symbol == s))
            .cloned()
            .collect())
    }

    async fn get_order_status(&self, _symbol: &str, selector: OrderSelector) -> Result<Order> {
        selector.validate()?;
        if let Some(id) = &selector.order_id {
            if let Some(order) = self.statuses.lock().get(id) {
                return Ok(order.clone());
            }
            if let Some(order) = self
                .open_orders
                .lock()
                .iter()
                .find(|o| &o.order_id == id)
            {
                return Ok(order.clone());
            }
        }
        Err(ExchangeError::InvalidOrder("order not found".into()))
    }
}
