//! Market-data types: candles, trades, tickers, books, trading constraints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};

/// One OHLCV bucket. Instances produced by this crate are always closed
/// candles; the stream parser drops open ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub interval: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// A single executed trade from the trade stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub time: DateTime<Utc>,
}

/// Best bid/ask snapshot.
///
/// From the book-ticker stream, `last` is approximated by the best bid;
/// subscribers that need the true last trade price must use the trade
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_qty: Decimal,
    pub ask_qty: Decimal,
    pub ts: DateTime<Utc>,
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub qty: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal, qty: Decimal) -> Self {
        Self { price, qty }
    }
}

/// Order book snapshot: bids descending, asks ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub ts: DateTime<Utc>,
}

impl OrderBook {
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Trading constraints for one symbol, parsed from venue filter records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    pub qty_step: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub price_step: Decimal,
    pub min_notional: Decimal,
    pub is_spot: bool,
    pub is_futures: bool,
    pub is_margin: bool,
    pub is_trading: bool,
}

impl SymbolInfo {
    /// Round a price toward zero to a multiple of `price_step`.
    #[must_use]
    pub fn round_price(&self, price: Decimal) -> Decimal {
        round_to_step(price, self.price_step)
    }

    /// Round a quantity toward zero to a multiple of `qty_step`.
    #[must_use]
    pub fn round_qty(&self, qty: Decimal) -> Decimal {
        round_to_step(qty, self.qty_step)
    }

    /// Check an order's quantity and price against this symbol's
    /// constraints before it goes on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidOrder`] naming the violated bound.
    pub fn validate_order(&self, qty: Decimal, price: Option<Decimal>) -> Result<()> {
        if qty < self.min_qty {
            return Err(ExchangeError::InvalidOrder(format!(
                "qty {qty} below minimum {} for {}",
                self.min_qty, self.symbol
            )));
        }
        if qty > self.max_qty {
            return Err(ExchangeError::InvalidOrder(format!(
                "qty {qty} above maximum {} for {}",
                self.max_qty, self.symbol
            )));
        }
        if let Some(price) = price {
            if price < self.min_price {
                return Err(ExchangeError::InvalidOrder(format!(
                    "price {price} below minimum {} for {}",
                    self.min_price, self.symbol
                )));
            }
            if price > self.max_price {
                return Err(ExchangeError::InvalidOrder(format!(
                    "price {price} above maximum {} for {}",
                    self.max_price, self.symbol
                )));
            }
            if price * qty < self.min_notional {
                return Err(ExchangeError::InvalidOrder(format!(
                    "notional {} below minimum {} for {}",
                    price * qty,
                    self.min_notional,
                    self.symbol
                )));
            }
        }
        Ok(())
    }
}

fn round_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    (value / step).trunc() * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_usdt_info() -> SymbolInfo {
        SymbolInfo {
            symbol: "BTC/USDT".into(),
            base: "BTC".into(),
            quote: "USDT".into(),
            min_qty: dec!(0.001),
            max_qty: dec!(1000),
            qty_step: dec!(0.001),
            min_price: dec!(556.80),
            max_price: dec!(4529764),
            price_step: dec!(0.10),
            min_notional: dec!(100),
            is_spot: false,
            is_futures: true,
            is_margin: false,
            is_trading: true,
        }
    }

    #[test]
    fn rounding_truncates_toward_zero() {
        let info = btc_usdt_info();
        assert_eq!(info.round_price(dec!(60123.4567)), dec!(60123.4));
        assert_eq!(info.round_qty(dec!(0.0029)), dec!(0.002));
        // Already aligned values are untouched.
        assert_eq!(info.round_price(dec!(60123.4)), dec!(60123.4));
    }

    #[test]
    fn validate_order_checks_bounds() {
        let info = btc_usdt_info();
        assert!(info.validate_order(dec!(0.002), Some(dec!(60000))).is_ok());
        assert!(info.validate_order(dec!(0.0001), None).is_err());
        assert!(info.validate_order(dec!(2000), None).is_err());
        assert!(info.validate_order(dec!(0.002), Some(dec!(1))).is_err());
        // 0.001 * 60000 = 60 < 100 notional floor.
        assert!(info.validate_order(dec!(0.001), Some(dec!(60000))).is_err());
    }

    #[test]
    fn book_helpers() {
        let book = OrderBook {
            symbol: "BTC/USDT".into(),
            bids: vec![
                PriceLevel::new(dec!(60000.0), dec!(1.5)),
                PriceLevel::new(dec!(59999.9), dec!(2.0)),
            ],
            asks: vec![
                PriceLevel::new(dec!(60000.1), dec!(0.7)),
                PriceLevel::new(dec!(60000.2), dec!(1.1)),
            ],
            ts: Utc::now(),
        };
        assert_eq!(book.best_bid(), Some(dec!(60000.0)));
        assert_eq!(book.best_ask(), Some(dec!(60000.1)));
        assert_eq!(book.spread(), Some(dec!(0.1)));
    }
}
