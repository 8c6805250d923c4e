//! Mapping from Binance error codes to the shared taxonomy.

use crate::error::ExchangeError;

/// Temporary faults worth retrying: internal error, timestamp outside
/// recv window, invalid signature from clock skew.
const TRANSIENT_CODES: &[i64] = &[-1001, -1021, -1022];

/// Parameter-shape rejections that retrying cannot fix.
const PERMANENT_CODES: &[i64] = &[-1100, -1102];

/// New-order/cancel rejections and filter violations: bad leverage, qty
/// outside bounds, price outside bounds.
const INVALID_ORDER_CODES: &[i64] = &[-2010, -2011, -4001, -4003, -4004, -4131, -4132];

/// Classify a raw venue error body into an [`ExchangeError`] kind.
///
/// The balance check runs first: Binance reports unfunded orders under
/// order-rejection codes, and callers need the sharper kind.
pub fn map_venue_error(code: i64, message: &str) -> ExchangeError {
    if message.to_lowercase().contains("insufficient balance") {
        return ExchangeError::InsufficientBalance(message.to_string());
    }
    if code == -1003 {
        return ExchangeError::RateLimit(message.to_string());
    }
    if INVALID_ORDER_CODES.contains(&code) {
        return ExchangeError::InvalidOrder(format!("{message} (code {code})"));
    }
    if TRANSIENT_CODES.contains(&code) {
        return ExchangeError::Transient {
            message: message.to_string(),
            code,
        };
    }
    if PERMANENT_CODES.contains(&code) {
        return ExchangeError::Permanent {
            message: message.to_string(),
            code,
        };
    }
    // Unrecognized codes are venue-side rejections we do not understand;
    // retrying blind would only burn the rate budget.
    ExchangeError::Permanent {
        message: message.to_string(),
        code,
    }
}
