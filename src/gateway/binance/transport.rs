//! Signed REST transport for the Binance futures API.
//!
//! Assembles query strings, signs them with HMAC-SHA256 where the
//! endpoint demands it, and decodes error bodies into the shared
//! taxonomy before anything reaches the caller.

use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error};

use super::errors::map_venue_error;
use crate::error::{ExchangeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Grace window the venue allows between our timestamp and its clock.
const RECV_WINDOW_MS: u64 = 5_000;

/// How much authentication an endpoint requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// Market data: no key, no signature.
    Public,
    /// Listen-key management: API key header only.
    ApiKey,
    /// Account and order endpoints: API key plus signed query.
    Signed,
}

/// Error body the venue attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct VenueErrorBody {
    code: i64,
    msg: String,
}

#[derive(Clone)]
pub struct RestTransport {
    http: HttpClient,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl RestTransport {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: String, api_secret: String) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into(),
            api_key,
            api_secret,
        }
    }

    /// Send one request and decode the JSON response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        security: Security,
    ) -> Result<T> {
        let mut query = encode_query(params);
        if security == Security::Signed {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&format!(
                "timestamp={}&recvWindow={RECV_WINDOW_MS}",
                chrono::Utc::now().timestamp_millis()
            ));
            let signature = sign(&self.api_secret, &query);
            query.push_str(&format!("&signature={signature}"));
        }

        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };

        debug!(method = %method, path, "Sending REST request");

        let mut request = self.http.request(method, &url);
        if security != Security::Public {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        error!(path, status = %status, body = %body, "Venue returned error");
        Err(decode_error(status, &body))
    }
}

/// Percent-encoding is deliberately minimal: Binance parameter values are
/// symbols, enum tokens, and decimal numbers, none of which need escaping.
fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC-SHA256 over the exact query string, hex-encoded.
fn sign(secret: &str, query: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn decode_error(status: StatusCode, body: &str) -> ExchangeError {
    if let Ok(venue) = serde_json::from_str::<VenueErrorBody>(body) {
        return map_venue_error(venue.code, &venue.msg);
    }
    // No structured body: classify by HTTP status alone.
    if status.is_server_error() {
        ExchangeError::Transient {
            message: format!("HTTP {status}"),
            code: 0,
        }
    } else {
        ExchangeError::Permanent {
            message: format!("HTTP {status}: {body}"),
            code: 0,
        }
    }
}
