//! Binance USD-M Futures gateway.
//!
//! Implements [`ExchangeGateway`] over the futures REST API and owns the
//! venue's WebSocket fan-in. Every REST call consults the venue's shared
//! rate limiter with the endpoint's documented weight, denormalizes
//! symbols through the codec, maps raw venue errors into the taxonomy,
//! and retries transient faults under the gateway's [`RetryPolicy`].

pub mod errors;
pub mod transport;
pub mod wire;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Method;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use self::transport::{RestTransport, Security};
use self::wire::{
    millis_to_utc_lossy, BookTicker, Depth, ExchangeInfo, ExchangeSymbol, FuturesAccount,
    KlineRow, ListenKey, OrderResponse, PositionModeResponse, PositionRisk, ServerTime, Ticker24h,
    VenueAck,
};
use super::{
    ExchangeGateway, NewOrder, OrderSelector, OHLC_DEFAULT_LIMIT, OHLC_MAX_LIMIT, ORDERBOOK_DEPTHS,
};
use crate::config::Venue;
use crate::domain::symbol::{denormalize, normalize};
use crate::domain::{
    Balance, Candle, Order, OrderBook, OrderType, Position, PositionMode, PositionSide, PriceLevel,
    SymbolInfo, Ticker,
};
use crate::error::{ExchangeError, Result};
use crate::limiter::RateLimiter;
use crate::retry::{with_retry, RetryPolicy};
use crate::stream::{MarketCallback, StreamManager, StreamStatsSnapshot, UserCallback};

/// The venue expires listen keys after 60 minutes; refresh at half that.
const LISTEN_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Venue spelling of an [`OrderType`] on the USD-M futures API. Note the
/// dialect trap: futures `TAKE_PROFIT` is the *limit* variant and the
/// market-style triggers carry a `_MARKET` suffix.
pub(crate) fn futures_order_type_token(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit => "LIMIT",
        OrderType::Market => "MARKET",
        OrderType::StopLoss => "STOP_MARKET",
        OrderType::StopLossLimit => "STOP",
        OrderType::TakeProfit => "TAKE_PROFIT_MARKET",
        OrderType::TakeProfitLimit => "TAKE_PROFIT",
    }
}

/// Inverse of [`futures_order_type_token`], tolerant of the canonical
/// spellings as well.
pub(crate) fn order_type_from_futures_token(token: &str) -> Result<OrderType> {
    match token {
        "LIMIT" => Ok(OrderType::Limit),
        "MARKET" => Ok(OrderType::Market),
        "STOP_MARKET" | "STOP_LOSS" => Ok(OrderType::StopLoss),
        "STOP" | "STOP_LOSS_LIMIT" => Ok(OrderType::StopLossLimit),
        "TAKE_PROFIT_MARKET" => Ok(OrderType::TakeProfit),
        "TAKE_PROFIT" | "TAKE_PROFIT_LIMIT" => Ok(OrderType::TakeProfitLimit),
        other => Err(ExchangeError::InvalidOrder(format!(
            "unknown futures order type token {other}"
        ))),
    }
}

/// Documented request weight of a klines page at the given limit.
fn klines_weight(limit: u32) -> u32 {
    match limit {
        0..=99 => 1,
        100..=499 => 2,
        500..=1000 => 5,
        _ => 10,
    }
}

/// Documented request weight of a depth snapshot.
fn depth_weight(depth: u32) -> u32 {
    match depth {
        0..=50 => 2,
        51..=100 => 5,
        101..=500 => 10,
        _ => 20,
    }
}

struct KeepaliveTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Gateway to Binance USD-M Futures, production or testnet.
///
/// The REST surface is [`ExchangeGateway`]; WebSocket subscriptions are
/// inherent methods because their callback shapes are venue-core concerns
/// rather than per-venue ones.
pub struct BinanceFutures {
    testnet: bool,
    transport: RestTransport,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    streams: StreamManager,
    listen_key: Mutex<Option<String>>,
    keepalive: Mutex<Option<KeepaliveTask>>,
    connected: AtomicBool,
}

impl BinanceFutures {
    #[must_use]
    pub fn new(api_key: String, api_secret: String, testnet: bool) -> Self {
        let config = Venue::Binance.config();
        let rest_base = config.rest_base(testnet);
        let ws_base = config.ws_base(testnet);

        info!(testnet, rest_base, "Binance futures gateway initialized");

        Self {
            testnet,
            transport: RestTransport::new(rest_base, api_key, api_secret),
            limiter: RateLimiter::shared(Venue::Binance),
            retry: RetryPolicy::default(),
            streams: StreamManager::new(Venue::Binance, ws_base),
            listen_key: Mutex::new(None),
            keepalive: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_testnet(&self) -> bool {
        self.testnet
    }

    /// Verify reachability and start the stream loops for anything
    /// already subscribed.
    pub async fn connect(&self) -> Result<()> {
        let server_time = self.server_time().await.map_err(|e| {
            error!(error = %e, "Failed to reach venue");
            ExchangeError::Connection(format!("connection check failed: {e}"))
        })?;
        info!(server_time = %server_time, testnet = self.testnet, "Connected to Binance");
        self.connected.store(true, Ordering::SeqCst);
        self.streams.start();
        Ok(())
    }

    /// Cancel the keepalive and both stream loops, awaiting each before
    /// returning.
    pub async fn disconnect(&self) {
        let keepalive = self.keepalive.lock().take();
        if let Some(task) = keepalive {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
        self.streams.shutdown().await;
        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from Binance");
    }

    /// Venue clock, UTC.
    pub async fn server_time(&self) -> Result<DateTime<Utc>> {
        let response: ServerTime = self
            .request("server_time", Method::GET, "/fapi/v1/time", vec![], Security::Public, 1, false)
            .await?;
        Ok(millis_to_utc_lossy(response.server_time))
    }

    /// Raw exchange info, the source for [`ExchangeGateway::get_symbol_info`].
    pub async fn get_exchange_info(&self) -> Result<ExchangeInfo> {
        self.request(
            "get_exchange_info",
            Method::GET,
            "/fapi/v1/exchangeInfo",
            vec![],
            Security::Public,
            1,
            false,
        )
        .await
    }

    /// Subscribe to closed candles for a canonical symbol. The callback
    /// observes at most one emission per candle, after close.
    pub async fn subscribe_kline(
        &self,
        symbol: &str,
        interval: &str,
        callback: MarketCallback,
    ) -> Result<()> {
        let venue_symbol = denormalize(symbol, Venue::Binance)?;
        self.streams
            .subscribe_kline(&venue_symbol, interval, callback)
            .await;
        Ok(())
    }

    /// Subscribe to individual trades for a canonical symbol.
    pub async fn subscribe_trade(&self, symbol: &str, callback: MarketCallback) -> Result<()> {
        let venue_symbol = denormalize(symbol, Venue::Binance)?;
        self.streams.subscribe_trade(&venue_symbol, callback).await;
        Ok(())
    }

    /// Subscribe to best bid/ask updates for a canonical symbol.
    pub async fn subscribe_book_ticker(
        &self,
        symbol: &str,
        callback: MarketCallback,
    ) -> Result<()> {
        let venue_symbol = denormalize(symbol, Venue::Binance)?;
        self.streams
            .subscribe_book_ticker(&venue_symbol, callback)
            .await;
        Ok(())
    }

    /// Subscribe to the user-data stream: order updates and account
    /// changes. Issues a listen key on first use and keeps it refreshed
    /// from the gateway side; the stream loop never touches REST.
    pub async fn subscribe_user_data(&self, callback: UserCallback) -> Result<()> {
        let existing = self.listen_key.lock().clone();
        let listen_key = match existing {
            Some(key) => key,
            None => {
                let issued = self.issue_listen_key().await?;
                *self.listen_key.lock() = Some(issued.clone());
                issued
            }
        };
        self.streams.subscribe_user(listen_key, callback).await;
        self.spawn_keepalive();
        Ok(())
    }

    /// Drop every stream subscription and stop the loops.
    pub async fn unsubscribe_all(&self) {
        self.streams.unsubscribe_all().await;
    }

    /// Fan-in telemetry: messages received, reconnections, last message.
    #[must_use]
    pub fn stream_stats(&self) -> StreamStatsSnapshot {
        self.streams.stats()
    }

    async fn issue_listen_key(&self) -> Result<String> {
        let response: ListenKey = self
            .request(
                "issue_listen_key",
                Method::POST,
                "/fapi/v1/listenKey",
                vec![],
                Security::ApiKey,
                1,
                false,
            )
            .await?;
        info!(prefix = &response.listen_key[..response.listen_key.len().min(8)],
              "Listen key obtained for user data stream");
        Ok(response.listen_key)
    }

    fn spawn_keepalive(&self) {
        let mut guard = self.keepalive.lock();
        if guard.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let transport = self.transport.clone();
        let limiter = Arc::clone(&self.limiter);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(LISTEN_KEY_REFRESH_INTERVAL) => {}
                }
                limiter.acquire(1, false).await;
                // Refresh failures are survivable: the next reconnection
                // surfaces a terminal error if the key truly expired.
                match transport
                    .request::<serde_json::Value>(
                        Method::PUT,
                        "/fapi/v1/listenKey",
                        &[],
                        Security::ApiKey,
                    )
                    .await
                {
                    Ok(_) => debug!("Listen key refreshed"),
                    Err(e) => warn!(error = %e, "Failed to refresh listen key"),
                }
            }
        });
        *guard = Some(KeepaliveTask { cancel, handle });
    }

    /// One rate-limited, retried REST call. The limiter is consulted per
    /// attempt so retries cannot slip under the ceilings.
    async fn request<T: DeserializeOwned>(
        &self,
        name: &'static str,
        method: Method,
        path: &'static str,
        params: Vec<(&'static str, String)>,
        security: Security,
        weight: u32,
        is_order: bool,
    ) -> Result<T> {
        with_retry(name, self.retry, || {
            let method = method.clone();
            let params = params.clone();
            async move {
                self.limiter.acquire(weight, is_order).await;
                self.transport.request(method, path, &params, security).await
            }
        })
        .await
    }

    fn venue_symbol(&self, symbol: &str) -> Result<String> {
        denormalize(symbol, Venue::Binance)
    }
}

#[async_trait]
impl ExchangeGateway for BinanceFutures {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo> {
        let venue_symbol = self.venue_symbol(symbol)?;
        let info = self.get_exchange_info().await?;

        let listing: &ExchangeSymbol = info
            .symbols
            .iter()
            .find(|s| s.symbol == venue_symbol)
            .ok_or_else(|| {
                ExchangeError::InvalidOrder(format!("symbol {symbol} not listed by venue"))
            })?;

        let (min_qty, max_qty, qty_step, min_price, max_price, price_step, min_notional) =
            listing.constraints();

        Ok(SymbolInfo {
            symbol: symbol.to_string(),
            base: listing.base_asset.clone(),
            quote: listing.quote_asset.clone(),
            min_qty,
            max_qty,
            qty_step,
            min_price,
            max_price,
            price_step,
            min_notional,
            is_spot: false,
            is_futures: true,
            is_margin: false,
            is_trading: listing.status == "TRADING",
        })
    }

    async fn get_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<Candle>> {
        let venue_symbol = self.venue_symbol(symbol)?;
        let requested = limit.unwrap_or(OHLC_DEFAULT_LIMIT);
        let limit = requested.min(OHLC_MAX_LIMIT);
        if requested > OHLC_MAX_LIMIT {
            warn!(requested, clamped = limit, "OHLC limit clamped to venue ceiling");
        }

        let mut params = vec![
            ("symbol", venue_symbol),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start {
            params.push(("startTime", start.timestamp_millis().to_string()));
        }
        if let Some(end) = end {
            params.push(("endTime", end.timestamp_millis().to_string()));
        }

        let rows: Vec<KlineRow> = self
            .request(
                "get_ohlc",
                Method::GET,
                "/fapi/v1/klines",
                params,
                Security::Public,
                klines_weight(limit),
                false,
            )
            .await?;

        // The last row is usually the still-forming bucket; only candles
        // whose interval has elapsed are returned.
        let now = Utc::now();
        let candles: Vec<Candle> = rows
            .into_iter()
            .map(|row| Candle {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                open_time: millis_to_utc_lossy(row.0),
                close_time: millis_to_utc_lossy(row.6),
                open: row.1,
                high: row.2,
                low: row.3,
                close: row.4,
                volume: row.5,
            })
            .filter(|candle| candle.close_time <= now)
            .collect();

        debug!(symbol, interval, count = candles.len(), "Fetched OHLC data");
        Ok(candles)
    }

    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker> {
        let venue_symbol = self.venue_symbol(symbol)?;

        let ticker: Ticker24h = self
            .request(
                "get_ticker_24h",
                Method::GET,
                "/fapi/v1/ticker/24hr",
                vec![("symbol", venue_symbol.clone())],
                Security::Public,
                1,
                false,
            )
            .await?;

        let book: BookTicker = self
            .request(
                "get_book_ticker",
                Method::GET,
                "/fapi/v1/ticker/bookTicker",
                vec![("symbol", venue_symbol)],
                Security::Public,
                2,
                false,
            )
            .await?;

        Ok(Ticker {
            symbol: symbol.to_string(),
            last: ticker.last_price,
            bid: book.bid_price,
            ask: book.ask_price,
            bid_qty: book.bid_qty,
            ask_qty: book.ask_qty,
            ts: millis_to_utc_lossy(ticker.close_time),
        })
    }

    async fn get_orderbook(&self, symbol: &str, depth: u32) -> Result<OrderBook> {
        if !ORDERBOOK_DEPTHS.contains(&depth) {
            return Err(ExchangeError::InvalidOrder(format!(
                "depth {depth} not in supported set {ORDERBOOK_DEPTHS:?}"
            )));
        }
        let venue_symbol = self.venue_symbol(symbol)?;

        let book: Depth = self
            .request(
                "get_orderbook",
                Method::GET,
                "/fapi/v1/depth",
                vec![("symbol", venue_symbol), ("limit", depth.to_string())],
                Security::Public,
                depth_weight(depth),
                false,
            )
            .await?;

        Ok(OrderBook {
            symbol: symbol.to_string(),
            bids: book
                .bids
                .into_iter()
                .map(|(price, qty)| PriceLevel::new(price, qty))
                .collect(),
            asks: book
                .asks
                .into_iter()
                .map(|(price, qty)| PriceLevel::new(price, qty))
                .collect(),
            ts: Utc::now(),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Balance>> {
        let account: FuturesAccount = self
            .request(
                "get_balances",
                Method::GET,
                "/fapi/v2/account",
                vec![],
                Security::Signed,
                5,
                false,
            )
            .await?;

        let balances: Vec<Balance> = account
            .assets
            .into_iter()
            .filter_map(|asset| {
                let total = asset.available_balance + asset.initial_margin;
                (total > Decimal::ZERO).then(|| Balance {
                    asset: asset.asset,
                    free: asset.available_balance,
                    locked: asset.initial_margin,
                    total,
                })
            })
            .collect();

        debug!(count = balances.len(), "Fetched account balances");
        Ok(balances)
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        let rows: Vec<PositionRisk> = self
            .request(
                "get_positions",
                Method::GET,
                "/fapi/v2/positionRisk",
                vec![],
                Security::Signed,
                5,
                false,
            )
            .await?;

        let mut positions = Vec::new();
        for row in rows {
            if row.position_amt.is_zero() {
                continue;
            }
            let side = if row.position_amt > Decimal::ZERO {
                PositionSide::Long
            } else {
                PositionSide::Short
            };
            positions.push(Position {
                symbol: normalize(&row.symbol, Venue::Binance)?,
                side,
                qty: row.position_amt.abs(),
                entry_price: row.entry_price,
                mark_price: row.mark_price,
                unrealized_pnl: row.unrealized_profit,
                leverage: row.leverage.to_u32().unwrap_or(1),
                liquidation_price: row.liquidation_price.filter(|p| !p.is_zero()),
            });
        }

        debug!(count = positions.len(), "Fetched positions");
        Ok(positions)
    }

    async fn get_position_mode(&self) -> Result<PositionMode> {
        let response: PositionModeResponse = self
            .request(
                "get_position_mode",
                Method::GET,
                "/fapi/v1/positionSide/dual",
                vec![],
                Security::Signed,
                30,
                false,
            )
            .await?;
        Ok(if response.dual_side_position {
            PositionMode::Hedge
        } else {
            PositionMode::OneWay
        })
    }

    async fn set_position_mode(&self, mode: PositionMode) -> Result<()> {
        let dual = matches!(mode, PositionMode::Hedge);
        let _: VenueAck = self
            .request(
                "set_position_mode",
                Method::POST,
                "/fapi/v1/positionSide/dual",
                vec![("dualSidePosition", dual.to_string())],
                Security::Signed,
                1,
                false,
            )
            .await?;
        info!(?mode, "Position mode set");
        Ok(())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        let venue_symbol = self.venue_symbol(symbol)?;
        let _: serde_json::Value = self
            .request(
                "set_leverage",
                Method::POST,
                "/fapi/v1/leverage",
                vec![
                    ("symbol", venue_symbol),
                    ("leverage", leverage.to_string()),
                ],
                Security::Signed,
                1,
                false,
            )
            .await?;
        info!(symbol, leverage, "Leverage set");
        Ok(())
    }

    async fn submit_order(&self, order: NewOrder) -> Result<Order> {
        // Argument errors never reach the wire.
        order.validate()?;
        let venue_symbol = self.venue_symbol(&order.symbol)?;

        let mut params = vec![
            ("symbol", venue_symbol),
            ("side", order.side.to_string()),
            ("type", futures_order_type_token(order.order_type).to_string()),
            ("quantity", order.qty.to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ];
        if order.order_type.requires_price() {
            // validate() guarantees presence.
            if let Some(price) = order.price {
                params.push(("price", price.to_string()));
                params.push(("timeInForce", order.time_in_force.to_string()));
            }
        }
        if order.order_type.requires_stop_price() {
            if let Some(stop_price) = order.stop_price {
                params.push(("stopPrice", stop_price.to_string()));
            }
        }
        let client_order_id = order
            .client_order_id
            .clone()
            .unwrap_or_else(|| format!("x-{}", Uuid::new_v4().simple()));
        params.push(("newClientOrderId", client_order_id));
        if order.reduce_only {
            params.push(("reduceOnly", "true".to_string()));
        }

        let response: OrderResponse = self
            .request(
                "submit_order",
                Method::POST,
                "/fapi/v1/order",
                params,
                Security::Signed,
                1,
                true,
            )
            .await?;

        let parsed = response.into_order(order.symbol.clone())?;
        info!(
            symbol = %order.symbol,
            side = %order.side,
            order_type = %order.order_type,
            qty = %order.qty,
            order_id = %parsed.order_id,
            "Order submitted"
        );
        Ok(parsed)
    }

    /// USD-M futures has no native cancel-replace: this cancels, then
    /// submits a replacement carrying the surviving parameters. When the
    /// cancel lands but the replacement is rejected, the caller receives
    /// [`ExchangeError::ModifyReplaceFailed`] and must know the original
    /// is gone.
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

        let replacement = NewOrder {
            symbol: symbol.to_string(),
            side: current.side,
            order_type: current.order_type,
            qty: qty.unwrap_or(current.qty),
            price: price.or(current.price),
            stop_price: current.stop_price,
            time_in_force: current.time_in_force,
            client_order_id: None,
            reduce_only: false,
        };

        match self.submit_order(replacement).await {
            Ok(order) => {
                info!(symbol, old_order_id = order_id, new_order_id = %order.order_id,
                      "Order modified via cancel-replace");
                Ok(order)
            }
            Err(e) => {
                error!(symbol, order_id, error = %e,
                       "Replacement rejected after cancel; original order is gone");
                Err(ExchangeError::ModifyReplaceFailed {
                    canceled_order_id: order_id.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    async fn cancel_order(&self, symbol: &str, selector: OrderSelector) -> Result<()> {
        selector.validate()?;
        let venue_symbol = self.venue_symbol(symbol)?;

        let mut params = vec![("symbol", venue_symbol)];
        if let Some(order_id) = &selector.order_id {
            params.push(("orderId", order_id.clone()));
        } else if let Some(client_order_id) = &selector.client_order_id {
            params.push(("origClientOrderId", client_order_id.clone()));
        }

        let _: OrderResponse = self
            .request(
                "cancel_order",
                Method::DELETE,
                "/fapi/v1/order",
                params,
                Security::Signed,
                1,
                false,
            )
            .await?;

        info!(
            symbol,
            order_id = selector.order_id.as_deref().unwrap_or(""),
            client_order_id = selector.client_order_id.as_deref().unwrap_or(""),
            "Order canceled"
        );
        Ok(())
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let mut params = Vec::new();
        // Unfiltered open-orders is one of the heaviest reads on the API.
        let weight = if let Some(symbol) = symbol {
            params.push(("symbol", self.venue_symbol(symbol)?));
            1
        } else {
            40
        };

        let rows: Vec<OrderResponse> = self
            .request(
                "get_open_orders",
                Method::GET,
                "/fapi/v1/openOrders",
                params,
                Security::Signed,
                weight,
                false,
            )
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let canonical = normalize(&row.symbol, Venue::Binance)?;
            orders.push(row.into_order(canonical)?);
        }
        debug!(count = orders.len(), "Fetched open orders");
        Ok(orders)
    }

    async fn get_order_status(&self, symbol: &str, selector: OrderSelector) -> Result<Order> {
        selector.validate()?;
        let venue_symbol = self.venue_symbol(symbol)?;

        let mut params = vec![("symbol", venue_symbol)];
        if let Some(order_id) = &selector.order_id {
            params.push(("orderId", order_id.clone()));
        } else if let Some(client_order_id) = &selector.client_order_id {
            params.push(("origClientOrderId", client_order_id.clone()));
        }

        let response: OrderResponse = self
            .request(
                "get_order_status",
                Method::GET,
                "/fapi/v1/order",
                params,
                Security::Signed,
                1,
                false,
            )
            .await?;

        response.into_order(symbol.to_string())
    }
}
