//! Frame parser: raw venue WebSocket payloads to typed events.
//!
//! Every parse failure is logged with context and swallowed; a malformed
//! frame must never take the stream loop or a subscriber down with it.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::Venue;
use crate::domain::symbol::normalize;
use crate::domain::{
    AccountBalance, AccountPosition, AccountUpdate, Candle, Order, Ticker, Trade,
};
use crate::gateway::binance::order_type_from_futures_token;
use crate::gateway::binance::wire::millis_to_utc_lossy;

/// Typed market-data event delivered to a stream subscriber.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Candle(Candle),
    Trade(Trade),
    Ticker(Ticker),
    /// Stream types we do not model; the payload passes through raw.
    Raw { stream: String, data: Value },
}

/// Typed user-data event delivered to the user-stream subscriber.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Order(Order),
    Account(AccountUpdate),
    /// Event types we do not model; the payload passes through raw.
    Raw(Value),
}

#[derive(Debug, Deserialize)]
struct KlineFrame {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: KlineData,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(rename = "t")]
    open_time: i64,
    #[serde(rename = "T")]
    close_time: i64,
    #[serde(rename = "i")]
    interval: String,
    #[serde(rename = "o")]
    open: Decimal,
    #[serde(rename = "h")]
    high: Decimal,
    #[serde(rename = "l")]
    low: Decimal,
    #[serde(rename = "c")]
    close: Decimal,
    #[serde(rename = "v")]
    volume: Decimal,
    #[serde(rename = "x")]
    is_closed: bool,
}

#[derive(Debug, Deserialize)]
struct TradeFrame {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: Decimal,
    #[serde(rename = "q")]
    qty: Decimal,
    #[serde(rename = "T")]
    trade_time: i64,
}

#[derive(Debug, Deserialize)]
struct BookTickerFrame {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bid: Decimal,
    #[serde(rename = "B")]
    bid_qty: Decimal,
    #[serde(rename = "a")]
    ask: Decimal,
    #[serde(rename = "A")]
    ask_qty: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderUpdateData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c")]
    client_order_id: String,
    #[serde(rename = "S")]
    side: String,
    #[serde(rename = "o")]
    order_type: String,
    #[serde(rename = "f", default)]
    time_in_force: Option<String>,
    #[serde(rename = "q")]
    qty: Decimal,
    #[serde(rename = "p", default)]
    price: Decimal,
    #[serde(rename = "ap", default)]
    avg_price: Decimal,
    #[serde(rename = "sp", default)]
    stop_price: Decimal,
    #[serde(rename = "X")]
    status: String,
    #[serde(rename = "i")]
    order_id: i64,
    #[serde(rename = "z", default)]
    filled_qty: Decimal,
    #[serde(rename = "L", default)]
    last_fill_price: Decimal,
    #[serde(rename = "n", default)]
    commission: Decimal,
    #[serde(rename = "N", default)]
    commission_asset: Option<String>,
    #[serde(rename = "T", default)]
    transaction_time: i64,
}

#[derive(Debug, Deserialize)]
struct AccountUpdateFrame {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "T")]
    transaction_time: i64,
    #[serde(rename = "a")]
    data: AccountUpdateData,
}

#[derive(Debug, Deserialize)]
struct AccountUpdateData {
    #[serde(rename = "B", default)]
    balances: Vec<BalanceDelta>,
    #[serde(rename = "P", default)]
    positions: Vec<PositionDelta>,
    #[serde(rename = "m", default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceDelta {
    #[serde(rename = "a")]
    asset: String,
    #[serde(rename = "wb")]
    wallet_balance: Decimal,
    #[serde(rename = "cw")]
    cross_wallet_balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct PositionDelta {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "pa")]
    position_amount: Decimal,
    #[serde(rename = "ep")]
    entry_price: Decimal,
    #[serde(rename = "up")]
    unrealized_pnl: Decimal,
    #[serde(rename = "ps")]
    position_side: String,
}

/// Stateless parser for one venue's frame dialect.
#[derive(Debug, Clone, Copy)]
pub struct StreamParser {
    venue: Venue,
}

impl StreamParser {
    #[must_use]
    pub fn new(venue: Venue) -> Self {
        Self { venue }
    }

    /// Parse a market-data payload for the given stream name. Returns
    /// `None` when the frame is an open candle or fails to parse.
    #[must_use]
    pub fn parse_market(&self, stream: &str, data: &Value) -> Option<MarketEvent> {
        if stream.contains("@kline_") {
            self.parse_kline(data).map(MarketEvent::Candle)
        } else if stream.contains("@trade") {
            self.parse_trade(data).map(MarketEvent::Trade)
        } else if stream.contains("@bookTicker") {
            self.parse_book_ticker(data).map(MarketEvent::Ticker)
        } else {
            warn!(stream, "Unknown market stream type, passing raw payload");
            Some(MarketEvent::Raw {
                stream: stream.to_string(),
                data: data.clone(),
            })
        }
    }

    /// Parse a kline payload. Open candles are dropped: subscribers see
    /// at most one emission per candle, after it closes.
    #[must_use]
    pub fn parse_kline(&self, data: &Value) -> Option<Candle> {
        let frame: KlineFrame = match serde_json::from_value(data.clone()) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to parse kline frame");
                return None;
            }
        };
        if !frame.kline.is_closed {
            return None;
        }
        let symbol = self.normalize_or_log(&frame.symbol)?;
        Some(Candle {
            symbol,
            interval: frame.kline.interval,
            open_time: millis_to_utc_lossy(frame.kline.open_time),
            close_time: millis_to_utc_lossy(frame.kline.close_time),
            open: frame.kline.open,
            high: frame.kline.high,
            low: frame.kline.low,
            close: frame.kline.close,
            volume: frame.kline.volume,
        })
    }

    #[must_use]
    pub fn parse_trade(&self, data: &Value) -> Option<Trade> {
        let frame: TradeFrame = match serde_json::from_value(data.clone()) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to parse trade frame");
                return None;
            }
        };
        let symbol = self.normalize_or_log(&frame.symbol)?;
        Some(Trade {
            symbol,
            price: frame.price,
            qty: frame.qty,
            time: millis_to_utc_lossy(frame.trade_time),
        })
    }

    /// Book-ticker frames carry no trade price; `last` is approximated by
    /// the best bid.
    #[must_use]
    pub fn parse_book_ticker(&self, data: &Value) -> Option<Ticker> {
        let frame: BookTickerFrame = match serde_json::from_value(data.clone()) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to parse book ticker frame");
                return None;
            }
        };
        let symbol = self.normalize_or_log(&frame.symbol)?;
        Some(Ticker {
            symbol,
            last: frame.bid,
            bid: frame.bid,
            ask: frame.ask,
            bid_qty: frame.bid_qty,
            ask_qty: frame.ask_qty,
            ts: Utc::now(),
        })
    }

    /// Route a user-data payload by its event type.
    #[must_use]
    pub fn parse_user(&self, data: &Value) -> Option<UserEvent> {
        match data.get("e").and_then(Value::as_str) {
            Some("ORDER_TRADE_UPDATE") | Some("executionReport") => {
                self.parse_order_update(data).map(UserEvent::Order)
            }
            Some("ACCOUNT_UPDATE") => self.parse_account_update(data).map(UserEvent::Account),
            other => {
                warn!(event_type = ?other, "Unknown user data event type, passing raw payload");
                Some(UserEvent::Raw(data.clone()))
            }
        }
    }

    fn parse_order_update(&self, data: &Value) -> Option<Order> {
        // Futures nests the order under "o"; spot's executionReport puts
        // the fields at the top level.
        let order_value = data.get("o").filter(|v| v.is_object()).unwrap_or(data);
        let update: OrderUpdateData = match serde_json::from_value(order_value.clone()) {
            Ok(update) => update,
            Err(e) => {
                error!(error = %e, "Failed to parse order update");
                return None;
            }
        };
        let symbol = self.normalize_or_log(&update.symbol)?;

        let order_type = match order_type_from_futures_token(&update.order_type) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "Order update carried unknown type token");
                return None;
            }
        };
        let status = match update.status.parse() {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Order update carried unknown status token");
                return None;
            }
        };
        let side = match update.side.parse() {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Order update carried unknown side token");
                return None;
            }
        };

        let price = if update.order_type == "MARKET" || update.price.is_zero() {
            None
        } else {
            Some(update.price)
        };
        let avg_fill_price = if update.avg_price.is_zero() {
            update.last_fill_price
        } else {
            update.avg_price
        };

        Some(Order {
            order_id: update.order_id.to_string(),
            client_order_id: update.client_order_id,
            symbol,
            side,
            order_type,
            status,
            qty: update.qty,
            executed_qty: update.filled_qty,
            price,
            stop_price: if update.stop_price.is_zero() {
                None
            } else {
                Some(update.stop_price)
            },
            avg_fill_price,
            commission: update.commission,
            commission_asset: update.commission_asset.unwrap_or_default(),
            time_in_force: update
                .time_in_force
                .as_deref()
                .and_then(|tif| tif.parse().ok())
                .unwrap_or(crate::domain::TimeInForce::Gtc),
            updated_at: millis_to_utc_lossy(update.transaction_time),
        })
    }

    fn parse_account_update(&self, data: &Value) -> Option<AccountUpdate> {
        let frame: AccountUpdateFrame = match serde_json::from_value(data.clone()) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to parse account update");
                return None;
            }
        };

        let positions = frame
            .data
            .positions
            .into_iter()
            .filter_map(|p| {
                let symbol = self.normalize_or_log(&p.symbol)?;
                let position_side = p.position_side.parse().ok()?;
                Some(AccountPosition {
                    symbol,
                    position_amount: p.position_amount,
                    entry_price: p.entry_price,
                    unrealized_pnl: p.unrealized_pnl,
                    position_side,
                })
            })
            .collect();

        Some(AccountUpdate {
            event_time: millis_to_utc_lossy(frame.event_time),
            transaction_time: millis_to_utc_lossy(frame.transaction_time),
            balances: frame
                .data
                .balances
                .into_iter()
                .map(|b| AccountBalance {
                    asset: b.asset,
                    wallet_balance: b.wallet_balance,
                    cross_wallet_balance: b.cross_wallet_balance,
                })
                .collect(),
            positions,
            reason: frame.data.reason.unwrap_or_else(|| "UNKNOWN".into()),
        })
    }

    fn normalize_or_log(&self, venue_symbol: &str) -> Option<String> {
        match normalize(venue_symbol, self.venue) {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                error!(venue_symbol, error = %e, "Failed to normalize stream symbol");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn parser() -> StreamParser {
        StreamParser::new(Venue::Binance)
    }

    fn kline_payload(is_closed: bool) -> Value {
        json!({
            "e": "kline", "E": 1625097659999i64, "s": "BTCUSDT",
            "k": {
                "t": 1625097600000i64, "T": 1625097659999i64,
                "s": "BTCUSDT", "i": "1m",
                "o": "33500.0", "h": "34000.0", "l": "33400.0",
                "c": "33900.5", "v": "1234.5", "x": is_closed
            }
        })
    }

    #[test]
    fn open_candles_are_dropped() {
        assert!(parser().parse_kline(&kline_payload(false)).is_none());
    }

    #[test]
    fn closed_candles_are_emitted() {
        let candle = parser().parse_kline(&kline_payload(true)).unwrap();
        assert_eq!(candle.symbol, "BTC/USDT");
        assert_eq!(candle.interval, "1m");
        assert_eq!(candle.close, dec!(33900.5));
        assert_eq!(candle.open_time.timestamp_millis(), 1625097600000);
        assert_eq!(candle.close_time.timestamp_millis(), 1625097659999);
    }

    #[test]
    fn malformed_kline_returns_none() {
        assert!(parser().parse_kline(&json!({"k": "not an object"})).is_none());
    }

    #[test]
    fn trade_frame_parses() {
        let trade = parser()
            .parse_trade(&json!({
                "e": "trade", "s": "ETHUSDT",
                "p": "1850.25", "q": "0.5", "T": 1625097600123i64
            }))
            .unwrap();
        assert_eq!(trade.symbol, "ETH/USDT");
        assert_eq!(trade.price, dec!(1850.25));
        assert_eq!(trade.qty, dec!(0.5));
    }

    #[test]
    fn book_ticker_approximates_last_with_best_bid() {
        let ticker = parser()
            .parse_book_ticker(&json!({
                "s": "BTCUSDT",
                "b": "60000.0", "B": "1.5",
                "a": "60000.1", "A": "0.7"
            }))
            .unwrap();
        assert_eq!(ticker.last, ticker.bid);
        assert_eq!(ticker.ask, dec!(60000.1));
        assert!(ticker.bid < ticker.ask);
    }

    #[test]
    fn market_routing_by_stream_name() {
        let event = parser()
            .parse_market("btcusdt@kline_1m", &kline_payload(true))
            .unwrap();
        assert!(matches!(event, MarketEvent::Candle(_)));

        let raw = parser()
            .parse_market("btcusdt@markPrice", &json!({"e": "markPriceUpdate"}))
            .unwrap();
        assert!(matches!(raw, MarketEvent::Raw { .. }));
    }

    #[test]
    fn futures_order_update_routes_to_order() {
        let event = parser()
            .parse_user(&json!({
                "e": "ORDER_TRADE_UPDATE", "E": 1625097600000i64, "T": 1625097600000i64,
                "o": {
                    "s": "BTCUSDT", "c": "grid-1", "S": "BUY", "o": "LIMIT",
                    "f": "GTC", "q": "0.002", "p": "57000", "ap": "0", "sp": "0",
                    "x": "NEW", "X": "NEW", "i": 8886774i64, "z": "0", "L": "0",
                    "T": 1625097600000i64
                }
            }))
            .unwrap();
        let UserEvent::Order(order) = event else {
            panic!("expected order event");
        };
        assert_eq!(order.order_id, "8886774");
        assert_eq!(order.symbol, "BTC/USDT");
        assert_eq!(order.price, Some(dec!(57000)));
        assert_eq!(order.status, crate::domain::OrderStatus::New);
    }

    #[test]
    fn account_update_routes_to_account() {
        let event = parser()
            .parse_user(&json!({
                "e": "ACCOUNT_UPDATE", "E": 1625097600000i64, "T": 1625097599000i64,
                "a": {
                    "m": "ORDER",
                    "B": [{"a": "USDT", "wb": "1000.5", "cw": "1000.5"}],
                    "P": [{"s": "BTCUSDT", "pa": "-0.002", "ep": "60000",
                           "up": "-1.2", "ps": "BOTH"}]
                }
            }))
            .unwrap();
        let UserEvent::Account(update) = event else {
            panic!("expected account event");
        };
        assert_eq!(update.reason, "ORDER");
        assert_eq!(update.balances[0].wallet_balance, dec!(1000.5));
        assert_eq!(update.positions[0].position_amount, dec!(-0.002));
    }

    #[test]
    fn unknown_user_event_passes_raw() {
        let event = parser()
            .parse_user(&json!({"e": "MARGIN_CALL", "E": 1i64}))
            .unwrap();
        assert!(matches!(event, UserEvent::Raw(_)));
    }
}
