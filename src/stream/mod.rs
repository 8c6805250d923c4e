//! WebSocket fan-in: resilient market-data and user-data streams.
//!
//! One [`StreamManager`] owns up to two long-lived socket loops. The
//! market loop serves a registry of stream-name subscriptions over a
//! combined-streams URL; the user loop serves a single callback over a
//! listen-key URL. Both reconnect forever with exponential backoff, ping
//! on a timer, and contain every transport error inside the loop: a
//! subscriber only ever sees parsed events.

pub mod parser;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Venue;
pub use parser::{MarketEvent, StreamParser, UserEvent};

/// Subscriber for one market-data stream.
pub type MarketCallback = Arc<dyn Fn(MarketEvent) + Send + Sync>;

/// Subscriber for the user-data stream.
pub type UserCallback = Arc<dyn Fn(UserEvent) + Send + Sync>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(120);
/// The venue closes idle sockets after 3 minutes without a ping.
const PING_INTERVAL: Duration = Duration::from_secs(60);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Next backoff after a failed or dropped connection: double, capped.
fn next_reconnect_delay(current: Duration) -> Duration {
    (current * 2).min(MAX_RECONNECT_DELAY)
}

/// Combined-streams URL: `wss://host/stream?streams=a/b/c`.
fn combined_stream_url(base: &str, streams: &[String]) -> String {
    format!("{base}/stream?streams={}", streams.join("/"))
}

/// Single-stream URL used for the user-data stream.
fn user_stream_url(base: &str, listen_key: &str) -> String {
    format!("{base}/ws/{listen_key}")
}

/// Venue-style stream name for a kline subscription.
fn kline_stream(venue_symbol: &str, interval: &str) -> String {
    format!("{}@kline_{interval}", venue_symbol.to_lowercase())
}

fn trade_stream(venue_symbol: &str) -> String {
    format!("{}@trade", venue_symbol.to_lowercase())
}

fn book_ticker_stream(venue_symbol: &str) -> String {
    format!("{}@bookTicker", venue_symbol.to_lowercase())
}

#[derive(Default)]
struct StreamStats {
    messages: AtomicU64,
    reconnections: AtomicU64,
    last_message_ms: AtomicI64,
}

impl StreamStats {
    fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.last_message_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// Telemetry snapshot for both streams.
#[derive(Debug, Clone, Copy)]
pub struct StreamStatsSnapshot {
    pub messages_received: u64,
    pub reconnections: u64,
    pub last_message: Option<DateTime<Utc>>,
}

#[derive(Clone)]
struct UserSubscription {
    listen_key: String,
    callback: UserCallback,
}

struct StreamTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Why a connected socket stopped serving.
enum SocketOutcome {
    /// Transport dropped or the peer closed; the loop should reconnect.
    Dropped,
    /// Cancellation was requested; the loop should exit.
    Cancelled,
}

/// Owns the market-data and user-data stream loops for one venue.
pub struct StreamManager {
    ws_base: String,
    parser: StreamParser,
    subscriptions: Arc<RwLock<BTreeMap<String, MarketCallback>>>,
    user: Arc<RwLock<Option<UserSubscription>>>,
    stats: Arc<StreamStats>,
    running: AtomicBool,
    market_task: Mutex<Option<StreamTask>>,
    user_task: Mutex<Option<StreamTask>>,
}

impl StreamManager {
    #[must_use]
    pub fn new(venue: Venue, ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
            parser: StreamParser::new(venue),
            subscriptions: Arc::new(RwLock::new(BTreeMap::new())),
            user: Arc::new(RwLock::new(None)),
            stats: Arc::new(StreamStats::default()),
            running: AtomicBool::new(false),
            market_task: Mutex::new(None),
            user_task: Mutex::new(None),
        }
    }

    /// Start loops for whatever is already registered. Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Stream manager already running");
            return;
        }
        if !self.subscriptions.read().is_empty() {
            self.spawn_market();
        }
        if self.user.read().is_some() {
            self.spawn_user();
        }
        info!("Stream manager started");
    }

    /// Cancel both loops and wait for them to finish.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let market = self.market_task.lock().take();
        let user = self.user_task.lock().take();
        for task in [market, user].into_iter().flatten() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                if !e.is_cancelled() {
                    error!(error = %e, "Stream task aborted");
                }
            }
        }
        info!("Stream manager stopped");
    }

    /// Register a kline subscriber. `venue_symbol` is the venue's own
    /// form (`BTCUSDT`).
    pub async fn subscribe_kline(&self, venue_symbol: &str, interval: &str, cb: MarketCallback) {
        let stream = kline_stream(venue_symbol, interval);
        info!(stream = %stream, "Subscribed to kline stream");
        self.insert_subscription(stream, cb).await;
    }

    pub async fn subscribe_trade(&self, venue_symbol: &str, cb: MarketCallback) {
        let stream = trade_stream(venue_symbol);
        info!(stream = %stream, "Subscribed to trade stream");
        self.insert_subscription(stream, cb).await;
    }

    pub async fn subscribe_book_ticker(&self, venue_symbol: &str, cb: MarketCallback) {
        let stream = book_ticker_stream(venue_symbol);
        info!(stream = %stream, "Subscribed to book ticker stream");
        self.insert_subscription(stream, cb).await;
    }

    /// Remove one market subscription; the loop restarts on the narrowed
    /// URL, or exits when nothing is left.
    pub async fn unsubscribe(&self, stream: &str) {
        let removed = self.subscriptions.write().remove(stream).is_some();
        if removed {
            info!(stream, "Unsubscribed from stream");
            if self.running.load(Ordering::SeqCst) {
                self.restart_market().await;
            }
        }
    }

    /// Register the user-data subscriber over an already-issued listen
    /// key. The key's keepalive is the gateway's job, not ours.
    pub async fn subscribe_user(&self, listen_key: impl Into<String>, cb: UserCallback) {
        *self.user.write() = Some(UserSubscription {
            listen_key: listen_key.into(),
            callback: cb,
        });
        info!("Subscribed to user data stream");
        if self.running.load(Ordering::SeqCst) {
            self.restart_user().await;
        }
    }

    /// Drop every subscription and stop both loops.
    pub async fn unsubscribe_all(&self) {
        self.subscriptions.write().clear();
        *self.user.write() = None;
        self.restart_market().await;
        self.restart_user().await;
        info!("Unsubscribed from all streams");
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStatsSnapshot {
        let last_ms = self.stats.last_message_ms.load(Ordering::Relaxed);
        StreamStatsSnapshot {
            messages_received: self.stats.messages.load(Ordering::Relaxed),
            reconnections: self.stats.reconnections.load(Ordering::Relaxed),
            last_message: (last_ms > 0)
                .then(|| chrono::TimeZone::timestamp_millis_opt(&Utc, last_ms).single())
                .flatten(),
        }
    }

    async fn insert_subscription(&self, stream: String, cb: MarketCallback) {
        self.subscriptions.write().insert(stream, cb);
        if self.running.load(Ordering::SeqCst) {
            self.restart_market().await;
        }
    }

    /// Graceful restart: stop the running loop, then respawn against the
    /// current registry.
    async fn restart_market(&self) {
        let running_task = self.market_task.lock().take();
        if let Some(task) = running_task {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
        if self.running.load(Ordering::SeqCst) && !self.subscriptions.read().is_empty() {
            self.spawn_market();
        }
    }

    async fn restart_user(&self) {
        let running_task = self.user_task.lock().take();
        if let Some(task) = running_task {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
        if self.running.load(Ordering::SeqCst) && self.user.read().is_some() {
            self.spawn_user();
        }
    }

    fn spawn_market(&self) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(market_loop(
            self.ws_base.clone(),
            self.parser,
            Arc::clone(&self.subscriptions),
            Arc::clone(&self.stats),
            cancel.clone(),
        ));
        *self.market_task.lock() = Some(StreamTask { cancel, handle });
    }

    fn spawn_user(&self) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(user_loop(
            self.ws_base.clone(),
            self.parser,
            Arc::clone(&self.user),
            Arc::clone(&self.stats),
            cancel.clone(),
        ));
        *self.user_task.lock() = Some(StreamTask { cancel, handle });
    }
}

async fn market_loop(
    ws_base: String,
    parser: StreamParser,
    subscriptions: Arc<RwLock<BTreeMap<String, MarketCallback>>>,
    stats: Arc<StreamStats>,
    cancel: CancellationToken,
) {
    let mut delay = INITIAL_RECONNECT_DELAY;
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let streams: Vec<String> = subscriptions.read().keys().cloned().collect();
        if streams.is_empty() {
            debug!("No market subscriptions, stopping market data loop");
            break;
        }
        let url = combined_stream_url(&ws_base, &streams);
        info!(url = %url, streams = streams.len(), "Connecting market data stream");

        let connected = tokio::select! {
            () = cancel.cancelled() => break,
            result = connect_async(&url) => result,
        };

        match connected {
            Ok((ws, _)) => {
                info!("Market data stream connected");
                delay = INITIAL_RECONNECT_DELAY;
                let outcome = run_socket(ws, &cancel, |text| {
                    dispatch_market(&parser, &subscriptions, &stats, text);
                })
                .await;
                if matches!(outcome, SocketOutcome::Cancelled) {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Market data connect failed");
            }
        }

        stats.reconnections.fetch_add(1, Ordering::Relaxed);
        warn!(
            delay_ms = delay.as_millis(),
            "Market data stream disconnected, reconnecting after delay"
        );
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        delay = next_reconnect_delay(delay);
    }
}

async fn user_loop(
    ws_base: String,
    parser: StreamParser,
    user: Arc<RwLock<Option<UserSubscription>>>,
    stats: Arc<StreamStats>,
    cancel: CancellationToken,
) {
    let mut delay = INITIAL_RECONNECT_DELAY;
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let Some(subscription) = user.read().clone() else {
            debug!("No user subscription, stopping user data loop");
            break;
        };
        let url = user_stream_url(&ws_base, &subscription.listen_key);
        info!("Connecting user data stream");

        let connected = tokio::select! {
            () = cancel.cancelled() => break,
            result = connect_async(&url) => result,
        };

        match connected {
            Ok((ws, _)) => {
                info!("User data stream connected");
                delay = INITIAL_RECONNECT_DELAY;
                let outcome = run_socket(ws, &cancel, |text| {
                    dispatch_user(&parser, &subscription.callback, &stats, text);
                })
                .await;
                if matches!(outcome, SocketOutcome::Cancelled) {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "User data connect failed");
            }
        }

        stats.reconnections.fetch_add(1, Ordering::Relaxed);
        warn!(
            delay_ms = delay.as_millis(),
            "User data stream disconnected, reconnecting after delay"
        );
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        delay = next_reconnect_delay(delay);
    }
}

/// Serve one connected socket until it drops or cancellation fires.
///
/// Pings every [`PING_INTERVAL`]; a pong that misses [`PONG_TIMEOUT`]
/// closes the socket so the outer loop reconnects instead of hanging on
/// a half-dead connection.
async fn run_socket<F>(mut ws: WsStream, cancel: &CancellationToken, mut on_text: F) -> SocketOutcome
where
    F: FnMut(&str),
{
    let mut ping = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    let mut pong_deadline: Option<Instant> = None;

    loop {
        // A disabled deadline still needs an Instant for sleep_until; the
        // guard below keeps it from ever firing.
        let expiry = pong_deadline.unwrap_or_else(|| Instant::now() + PING_INTERVAL);

        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws.close(None).await;
                return SocketOutcome::Cancelled;
            }
            _ = ping.tick() => {
                if ws.send(Message::Ping(Vec::new())).await.is_err() {
                    return SocketOutcome::Dropped;
                }
                if pong_deadline.is_none() {
                    pong_deadline = Some(Instant::now() + PONG_TIMEOUT);
                }
            }
            () = tokio::time::sleep_until(expiry), if pong_deadline.is_some() => {
                warn!("Pong timeout, closing connection");
                let _ = ws.close(None).await;
                return SocketOutcome::Dropped;
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => on_text(&text),
                Some(Ok(Message::Ping(payload))) => {
                    if ws.send(Message::Pong(payload)).await.is_err() {
                        return SocketOutcome::Dropped;
                    }
                }
                Some(Ok(Message::Pong(_))) => pong_deadline = None,
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "WebSocket closed by server");
                    return SocketOutcome::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket error");
                    return SocketOutcome::Dropped;
                }
                None => {
                    warn!("WebSocket stream ended");
                    return SocketOutcome::Dropped;
                }
            }
        }
    }
}

/// Decode a market frame, route it to its subscriber, and isolate the
/// subscriber: a panic inside one callback never reaches the loop or the
/// other subscribers.
fn dispatch_market(
    parser: &StreamParser,
    subscriptions: &RwLock<BTreeMap<String, MarketCallback>>,
    stats: &StreamStats,
    text: &str,
) {
    stats.record_message();

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "Failed to decode market message");
            return;
        }
    };

    // Combined-streams framing wraps the payload; single-stream frames
    // carry the event type inline.
    let (stream, data) = match value.get("stream").and_then(Value::as_str) {
        Some(stream) => (
            stream.to_string(),
            value.get("data").cloned().unwrap_or(Value::Null),
        ),
        None => {
            let stream = value
                .get("e")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            (stream, value)
        }
    };

    let callback = subscriptions.read().get(&stream).cloned();
    let Some(callback) = callback else {
        debug!(stream = %stream, "No subscriber for stream");
        return;
    };

    if let Some(event) = parser.parse_market(&stream, &data) {
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            error!(stream = %stream, "Market data subscriber panicked");
        }
    }
}

fn dispatch_user(parser: &StreamParser, callback: &UserCallback, stats: &StreamStats, text: &str) {
    stats.record_message();

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "Failed to decode user message");
            return;
        }
    };

    if let Some(event) = parser.parse_user(&value) {
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            error!("User data subscriber panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delays_double_and_cap() {
        let mut delay = INITIAL_RECONNECT_DELAY;
        let mut observed = Vec::new();
        for _ in 0..9 {
            observed.push(delay.as_secs());
            delay = next_reconnect_delay(delay);
        }
        assert_eq!(observed, [1, 2, 4, 8, 16, 32, 64, 120, 120]);
    }

    #[test]
    fn combined_url_joins_streams() {
        let url = combined_stream_url(
            "wss://fstream.binance.com",
            &["btcusdt@kline_1m".into(), "ethusdt@trade".into()],
        );
        assert_eq!(
            url,
            "wss://fstream.binance.com/stream?streams=btcusdt@kline_1m/ethusdt@trade"
        );
    }

    #[test]
    fn user_url_embeds_listen_key() {
        assert_eq!(
            user_stream_url("wss://fstream.binance.com", "abc123"),
            "wss://fstream.binance.com/ws/abc123"
        );
    }

    #[test]
    fn stream_names_are_lowercased() {
        assert_eq!(kline_stream("BTCUSDT", "1m"), "btcusdt@kline_1m");
        assert_eq!(trade_stream("ETHUSDT"), "ethusdt@trade");
        assert_eq!(book_ticker_stream("BTCUSDT"), "btcusdt@bookTicker");
    }

    #[tokio::test]
    async fn subscriptions_mutate_registry_without_running_loop() {
        let manager = StreamManager::new(Venue::Binance, "wss://example.invalid");
        manager
            .subscribe_kline("BTCUSDT", "1m", Arc::new(|_| {}))
            .await;
        manager.subscribe_trade("ETHUSDT", Arc::new(|_| {})).await;
        assert_eq!(manager.subscription_count(), 2);

        manager.unsubscribe("ethusdt@trade").await;
        assert_eq!(manager.subscription_count(), 1);

        manager.unsubscribe_all().await;
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn dispatch_isolates_panicking_subscriber() {
        let parser = StreamParser::new(Venue::Binance);
        let stats = StreamStats::default();
        let subs: RwLock<BTreeMap<String, MarketCallback>> = RwLock::new(BTreeMap::new());
        subs.write().insert(
            "btcusdt@trade".into(),
            Arc::new(|_| panic!("subscriber bug")),
        );

        let frame = r#"{"stream":"btcusdt@trade","data":{"e":"trade","s":"BTCUSDT","p":"60000","q":"0.1","T":1625097600000}}"#;
        // Must not propagate the panic.
        dispatch_market(&parser, &subs, &stats, frame);
        assert_eq!(stats.messages.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn dispatch_counts_malformed_frames_without_crashing() {
        let parser = StreamParser::new(Venue::Binance);
        let stats = StreamStats::default();
        let subs: RwLock<BTreeMap<String, MarketCallback>> = RwLock::new(BTreeMap::new());
        dispatch_market(&parser, &subs, &stats, "not json at all");
        assert_eq!(stats.messages.load(Ordering::Relaxed), 1);
    }
}
