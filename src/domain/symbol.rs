//! Symbol codec: canonical `BASE/QUOTE` to venue-specific forms and back.
//!
//! Venues that use a separator (`BTC-USDT`) round-trip trivially. Venues
//! that concatenate (`BTCUSDT`) are split against a priority-ordered list
//! of known quote assets, longest suffix first.

use crate::config::Venue;
use crate::error::{ExchangeError, Result};

/// Known quote assets for separator-less venues, longest first so that a
/// four-letter quote is never shadowed by a three-letter one.
const QUOTE_ASSETS: &[&str] = &["USDT", "BUSD", "USDC", "BTC", "ETH", "BNB", "DAI"];

/// Canonical separator in normalized symbols.
pub const CANONICAL_SEPARATOR: char = '/';

/// Convert a venue symbol to the canonical `BASE/QUOTE` form.
///
/// # Errors
///
/// Returns [`ExchangeError::InvalidOrder`] when the venue form cannot be
/// split into base and quote.
pub fn normalize(venue_symbol: &str, venue: Venue) -> Result<String> {
    let sep = venue.config().symbol_separator;
    let upper = venue_symbol.to_ascii_uppercase();

    if !sep.is_empty() {
        let (base, quote) = upper.split_once(sep).ok_or_else(|| {
            ExchangeError::InvalidOrder(format!(
                "symbol {venue_symbol} has no '{sep}' separator for {venue}"
            ))
        })?;
        return Ok(format!("{base}{CANONICAL_SEPARATOR}{quote}"));
    }

    for quote in QUOTE_ASSETS {
        if let Some(base) = upper.strip_suffix(quote) {
            if !base.is_empty() {
                return Ok(format!("{base}{CANONICAL_SEPARATOR}{quote}"));
            }
        }
    }

    Err(ExchangeError::InvalidOrder(format!(
        "symbol {venue_symbol} does not end in a known quote asset"
    )))
}

/// Convert a canonical `BASE/QUOTE` symbol to the venue form.
///
/// # Errors
///
/// Returns [`ExchangeError::InvalidOrder`] when the symbol is not in
/// canonical form.
pub fn denormalize(symbol: &str, venue: Venue) -> Result<String> {
    let (base, quote) = split_canonical(symbol)?;
    let sep = venue.config().symbol_separator;
    Ok(format!("{base}{sep}{quote}"))
}

/// Split a canonical symbol into `(base, quote)`.
///
/// # Errors
///
/// Returns [`ExchangeError::InvalidOrder`] when either side is empty or
/// the separator is missing.
pub fn split_canonical(symbol: &str) -> Result<(&str, &str)> {
    let (base, quote) = symbol.split_once(CANONICAL_SEPARATOR).ok_or_else(|| {
        ExchangeError::InvalidOrder(format!("symbol {symbol} is not in BASE/QUOTE form"))
    })?;
    if base.is_empty() || quote.is_empty() {
        return Err(ExchangeError::InvalidOrder(format!(
            "symbol {symbol} is not in BASE/QUOTE form"
        )));
    }
    Ok((base, quote))
}
