//! Per-venue configuration: endpoints, rate ceilings, symbol formatting.
//!
//! Configs are compiled in; credentials and the testnet switch are the
//! caller's job. File loading and CLI wiring live outside this crate.

use std::fmt;

/// Supported venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Binance,
    Okx,
    Bybit,
}

impl Venue {
    /// Built-in configuration for this venue.
    #[must_use]
    pub fn config(self) -> &'static VenueConfig {
        match self {
            Self::Binance => &BINANCE_FUTURES,
            Self::Okx => &OKX,
            Self::Bybit => &BYBIT,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Okx => "okx",
            Self::Bybit => "bybit",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate ceilings a venue enforces per API key / IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub weight_per_minute: u32,
    pub orders_per_second: u32,
    pub ws_connections_per_ip: u32,
}

/// Static description of one venue.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    pub venue: Venue,
    pub rest_url: &'static str,
    pub rest_testnet_url: &'static str,
    pub ws_url: &'static str,
    pub ws_testnet_url: &'static str,
    pub rate_limits: RateLimitConfig,
    /// Separator between base and quote in the venue's symbol form.
    /// Empty means the venue concatenates (`BTCUSDT`).
    pub symbol_separator: &'static str,
    pub supports_stop_orders: bool,
    pub supports_hedge_mode: bool,
}

impl VenueConfig {
    /// REST base URL for the chosen environment.
    #[must_use]
    pub fn rest_base(&self, testnet: bool) -> &'static str {
        if testnet {
            self.rest_testnet_url
        } else {
            self.rest_url
        }
    }

    /// WebSocket base URL for the chosen environment.
    #[must_use]
    pub fn ws_base(&self, testnet: bool) -> &'static str {
        if testnet {
            self.ws_testnet_url
        } else {
            self.ws_url
        }
    }
}

/// Binance USD-M Futures.
pub static BINANCE_FUTURES: VenueConfig = VenueConfig {
    venue: Venue::Binance,
    rest_url: "https://fapi.binance.com",
    rest_testnet_url: "https://testnet.binancefuture.com",
    ws_url: "wss://fstream.binance.com",
    ws_testnet_url: "wss://stream.binancefuture.com",
    rate_limits: RateLimitConfig {
        requests_per_minute: 2400,
        weight_per_minute: 2400,
        orders_per_second: 300,
        ws_connections_per_ip: 300,
    },
    symbol_separator: "",
    supports_stop_orders: true,
    supports_hedge_mode: true,
};

pub static OKX: VenueConfig = VenueConfig {
    venue: Venue::Okx,
    rest_url: "https://www.okx.com",
    rest_testnet_url: "https://www.okx.com",
    ws_url: "wss://ws.okx.com:8443",
    ws_testnet_url: "wss://wspap.okx.com:8443",
    rate_limits: RateLimitConfig {
        requests_per_minute: 1200,
        weight_per_minute: 1200,
        orders_per_second: 60,
        ws_connections_per_ip: 100,
    },
    symbol_separator: "-",
    supports_stop_orders: true,
    supports_hedge_mode: true,
};

pub static BYBIT: VenueConfig = VenueConfig {
    venue: Venue::Bybit,
    rest_url: "https://api.bybit.com",
    rest_testnet_url: "https://api-testnet.bybit.com",
    ws_url: "wss://stream.bybit.com",
    ws_testnet_url: "wss://stream-testnet.bybit.com",
    rate_limits: RateLimitConfig {
        requests_per_minute: 1200,
        weight_per_minute: 1200,
        orders_per_second: 100,
        ws_connections_per_ip: 200,
    },
    symbol_separator: "",
    supports_stop_orders: true,
    supports_hedge_mode: true,
};
