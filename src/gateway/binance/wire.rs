//! Wire types for Binance futures REST responses.
//!
//! Binance sends every decimal as a string; `rust_decimal`'s serde
//! support parses both spellings, so these structs stay declarative.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Order, OrderStatus, TimeInForce};
use crate::error::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    pub server_time: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<ExchangeSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSymbol {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// The filter records we consume; everything else collapses to `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price {
        min_price: Decimal,
        max_price: Decimal,
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        min_qty: Decimal,
        max_qty: Decimal,
        step_size: Decimal,
    },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { notional: Decimal },
    #[serde(other)]
    Other,
}

/// One kline row: Binance returns a positional array per candle.
#[derive(Debug, Deserialize)]
pub struct KlineRow(
    pub i64,     // open time
    pub Decimal, // open
    pub Decimal, // high
    pub Decimal, // low
    pub Decimal, // close
    pub Decimal, // volume
    pub i64,     // close time
    #[serde(default)] pub serde_json::Value, // quote volume
    #[serde(default)] pub serde_json::Value, // trade count
    #[serde(default)] pub serde_json::Value, // taker buy base
    #[serde(default)] pub serde_json::Value, // taker buy quote
    #[serde(default)] pub serde_json::Value, // ignore
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub last_price: Decimal,
    pub close_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub bid_price: Decimal,
    pub bid_qty: Decimal,
    pub ask_price: Decimal,
    pub ask_qty: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct Depth {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

#[derive(Debug, Deserialize)]
pub struct FuturesAccount {
    pub assets: Vec<FuturesAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesAsset {
    pub asset: String,
    pub available_balance: Decimal,
    pub initial_margin: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub symbol: String,
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    #[serde(rename = "unRealizedProfit")]
    pub unrealized_profit: Decimal,
    pub leverage: Decimal,
    #[serde(default)]
    pub liquidation_price: Option<Decimal>,
    pub position_side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionModeResponse {
    pub dual_side_position: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenKey {
    pub listen_key: String,
}

/// Order record as the REST API reports it, shared by the submit, query,
/// and open-orders endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub status: String,
    pub orig_qty: Decimal,
    #[serde(default)]
    pub executed_qty: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    #[serde(default)]
    pub stop_price: Decimal,
    #[serde(default)]
    pub cum_quote: Decimal,
    #[serde(default)]
    pub time_in_force: Option<String>,
    #[serde(default)]
    pub update_time: Option<i64>,
}

impl OrderResponse {
    /// Build the normalized [`Order`], given the already-normalized
    /// symbol.
    ///
    /// Rules: MARKET orders carry no price; the average fill price falls
    /// back to `cumQuote / executedQty` when the venue reports zero but a
    /// fill has happened.
    pub fn into_order(self, symbol: String) -> Result<Order> {
        let order_type = super::order_type_from_futures_token(&self.order_type)?;
        let status: OrderStatus = self.status.parse()?;

        let price = if self.order_type == "MARKET" || self.price.is_zero() {
            None
        } else {
            Some(self.price)
        };

        let mut avg_fill_price = self.avg_price;
        if avg_fill_price.is_zero() && !self.executed_qty.is_zero() && !self.cum_quote.is_zero() {
            avg_fill_price = self.cum_quote / self.executed_qty;
        }

        let time_in_force = match self.time_in_force.as_deref() {
            Some(tif) => tif.parse()?,
            None => TimeInForce::Gtc,
        };

        Ok(Order {
            order_id: self.order_id.to_string(),
            client_order_id: self.client_order_id,
            symbol,
            side: self.side.parse()?,
            order_type,
            status,
            qty: self.orig_qty,
            executed_qty: self.executed_qty,
            price,
            stop_price: if self.stop_price.is_zero() {
                None
            } else {
                Some(self.stop_price)
            },
            avg_fill_price,
            // Fees arrive on the user stream per fill, not here.
            commission: Decimal::ZERO,
            commission_asset: String::new(),
            time_in_force,
            updated_at: self
                .update_time
                .and_then(millis_to_utc)
                .unwrap_or_else(Utc::now),
        })
    }
}

/// Millisecond epoch timestamp to UTC; `None` for out-of-range values.
pub fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Millisecond epoch timestamp, defaulting to the epoch when the venue
/// sends garbage. Used where a missing timestamp must not drop a frame.
pub fn millis_to_utc_lossy(ms: i64) -> DateTime<Utc> {
    millis_to_utc(ms).unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
}

impl ExchangeSymbol {
    /// Flatten the filter list into the tuple the gateway needs:
    /// `(min_qty, max_qty, qty_step, min_price, max_price, price_step,
    /// min_notional)`. Missing filters degrade to zeros.
    #[must_use]
    pub fn constraints(
        &self,
    ) -> (
        Decimal,
        Decimal,
        Decimal,
        Decimal,
        Decimal,
        Decimal,
        Decimal,
    ) {
        let mut out = (
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        for filter in &self.filters {
            match filter {
                SymbolFilter::LotSize {
                    min_qty,
                    max_qty,
                    step_size,
                } => {
                    out.0 = *min_qty;
                    out.1 = *max_qty;
                    out.2 = *step_size;
                }
                SymbolFilter::Price {
                    min_price,
                    max_price,
                    tick_size,
                } => {
                    out.3 = *min_price;
                    out.4 = *max_price;
                    out.5 = *tick_size;
                }
                SymbolFilter::MinNotional { notional } => out.6 = *notional,
                SymbolFilter::Other => {}
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
pub struct VenueAck {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn filters_deserialize_by_tag() {
        let raw = r#"{
            "symbol": "BTCUSDT",
            "status": "TRADING",
            "baseAsset": "BTC",
            "quoteAsset": "USDT",
            "filters": [
                {"filterType": "PRICE_FILTER", "minPrice": "556.80", "maxPrice": "4529764", "tickSize": "0.10"},
                {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "1000", "stepSize": "0.001"},
                {"filterType": "MIN_NOTIONAL", "notional": "100"},
                {"filterType": "PERCENT_PRICE", "multiplierUp": "1.05"}
            ]
        }"#;
        let symbol: ExchangeSymbol = serde_json::from_str(raw).unwrap();
        let (min_qty, max_qty, qty_step, min_price, max_price, price_step, notional) =
            symbol.constraints();
        assert_eq!(min_qty, dec!(0.001));
        assert_eq!(max_qty, dec!(1000));
        assert_eq!(qty_step, dec!(0.001));
        assert_eq!(min_price, dec!(556.80));
        assert_eq!(max_price, dec!(4529764));
        assert_eq!(price_step, dec!(0.10));
        assert_eq!(notional, dec!(100));
    }

    #[test]
    fn kline_row_parses_positional_array() {
        let raw = r#"[1625097600000,"33500.0","34000.0","33400.0","33900.5","1234.5",1625097659999,"41500000",2500,"600.1","20100000","0"]"#;
        let row: KlineRow = serde_json::from_str(raw).unwrap();
        assert_eq!(row.0, 1625097600000);
        assert_eq!(row.4, dec!(33900.5));
        assert_eq!(row.6, 1625097659999);
    }

    #[test]
    fn market_order_has_no_price() {
        let raw = r#"{
            "orderId": 101, "clientOrderId": "x-1", "symbol": "BTCUSDT",
            "side": "BUY", "type": "MARKET", "status": "FILLED",
            "origQty": "0.002", "executedQty": "0.002",
            "price": "0", "avgPrice": "60123.4", "cumQuote": "120.2468",
            "updateTime": 1625097600000
        }"#;
        let order = serde_json::from_str::<OrderResponse>(raw)
            .unwrap()
            .into_order("BTC/USDT".into())
            .unwrap();
        assert!(order.price.is_none());
        assert_eq!(order.avg_fill_price, dec!(60123.4));
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn avg_price_falls_back_to_cum_quote() {
        let raw = r#"{
            "orderId": 102, "clientOrderId": "x-2", "symbol": "BTCUSDT",
            "side": "SELL", "type": "LIMIT", "status": "PARTIALLY_FILLED",
            "origQty": "0.004", "executedQty": "0.002",
            "price": "60000", "avgPrice": "0", "cumQuote": "120",
            "timeInForce": "GTC"
        }"#;
        let order = serde_json::from_str::<OrderResponse>(raw)
            .unwrap()
            .into_order("BTC/USDT".into())
            .unwrap();
        assert_eq!(order.price, Some(dec!(60000)));
        assert_eq!(order.avg_fill_price, dec!(60000));
    }

    #[test]
    fn unfilled_limit_keeps_zero_avg_price() {
        let raw = r#"{
            "orderId": 103, "clientOrderId": "x-3", "symbol": "BTCUSDT",
            "side": "BUY", "type": "LIMIT", "status": "NEW",
            "origQty": "0.002", "executedQty": "0",
            "price": "57000", "avgPrice": "0", "cumQuote": "0",
            "timeInForce": "GTC"
        }"#;
        let order = serde_json::from_str::<OrderResponse>(raw)
            .unwrap()
            .into_order("BTC/USDT".into())
            .unwrap();
        assert_eq!(order.avg_fill_price, Decimal::ZERO);
        assert_eq!(order.remaining_qty(), dec!(0.002));
    }
}
