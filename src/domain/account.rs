//! Account state: balances, positions, user-stream account updates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// One asset's balance. `total = free + locked`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
    /// Hedge-mode net bucket.
    Both,
}

impl PositionSide {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Both => "BOTH",
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionSide {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            "BOTH" => Ok(Self::Both),
            other => Err(ExchangeError::InvalidOrder(format!(
                "unknown position side token {other}"
            ))),
        }
    }
}

/// Futures position model: one-way nets longs against shorts per symbol,
/// hedge keeps them separate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionMode {
    OneWay,
    Hedge,
}

/// An open futures position. `qty` is always positive; direction lives in
/// `side`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub qty: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: u32,
    pub liquidation_price: Option<Decimal>,
}

/// Balance delta carried by an `ACCOUNT_UPDATE` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub asset: String,
    pub wallet_balance: Decimal,
    pub cross_wallet_balance: Decimal,
}

/// Position delta carried by an `ACCOUNT_UPDATE` event. `position_amount`
/// keeps the venue's sign: negative means short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPosition {
    pub symbol: String,
    pub position_amount: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub position_side: PositionSide,
}

/// User-stream notification that account state changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub event_time: DateTime<Utc>,
    pub transaction_time: DateTime<Utc>,
    pub balances: Vec<AccountBalance>,
    pub positions: Vec<AccountPosition>,
    /// Venue reason tag, e.g. `ORDER`, `FUNDING_FEE`.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_side_tokens_round_trip() {
        for side in [PositionSide::Long, PositionSide::Short, PositionSide::Both] {
            assert_eq!(side.as_str().parse::<PositionSide>().unwrap(), side);
        }
        assert!("SIDEWAYS".parse::<PositionSide>().is_err());
    }
}
