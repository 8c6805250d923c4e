//! In-memory order registry with callback dispatch.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::state::OrderStateMachine;
use crate::domain::Order;
use crate::error::{ExchangeError, Result};

/// Subscriber notified after every registry mutation.
pub type OrderCallback = Arc<dyn Fn(&Order) + Send + Sync>;

#[derive(Default)]
struct Indices {
    by_order_id: HashMap<String, Order>,
    by_client_order_id: HashMap<String, String>,
}

/// The OMS order book: every tracked order, indexed by venue id and
/// client id.
///
/// All mutation flows through [`add`](Self::add), [`update`](Self::update),
/// and [`remove`](Self::remove); readers get clones. Callbacks run in
/// registration order, outside the index lock, and a panicking callback
/// is logged and skipped so the others still see the event.
#[derive(Default)]
pub struct OrderRegistry {
    indices: Mutex<Indices>,
    callbacks: RwLock<Vec<OrderCallback>>,
}

impl OrderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for order events. Callbacks cannot be removed;
    /// registrations live as long as the registry.
    pub fn register_callback(&self, callback: OrderCallback) {
        self.callbacks.write().push(callback);
        debug!("Order callback registered");
    }

    /// Track a new order.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::AlreadyExists`] when the order id is
    /// already tracked.
    pub fn add(&self, order: Order) -> Result<()> {
        {
            let mut indices = self.indices.lock();
            if indices.by_order_id.contains_key(&order.order_id) {
                return Err(ExchangeError::AlreadyExists(order.order_id));
            }
            if !order.client_order_id.is_empty() {
                indices
                    .by_client_order_id
                    .insert(order.client_order_id.clone(), order.order_id.clone());
            }
            indices
                .by_order_id
                .insert(order.order_id.clone(), order.clone());
        }

        info!(
            order_id = %order.order_id,
            client_order_id = %order.client_order_id,
            symbol = %order.symbol,
            status = %order.status,
            "Order added to registry"
        );
        self.dispatch(&order);
        Ok(())
    }

    /// Apply an update to a tracked order, validating the status
    /// transition. Unknown ids delegate to [`add`](Self::add), which
    /// makes updates idempotent against out-of-order arrival: a repeat
    /// of the current status is a self-transition and only refreshes
    /// fields, while a regression fails with `InvalidTransition`.
    pub fn update(&self, order: Order) -> Result<()> {
        {
            let mut indices = self.indices.lock();
            let Some(existing) = indices.by_order_id.get(&order.order_id) else {
                drop(indices);
                warn!(order_id = %order.order_id, "Update for untracked order, adding");
                return self.add(order);
            };

            let old_status = existing.status;
            if old_status != order.status {
                OrderStateMachine::validate_transition(old_status, order.status)?;
                info!(
                    order_id = %order.order_id,
                    symbol = %order.symbol,
                    old_status = %old_status,
                    new_status = %order.status,
                    "Order status transition"
                );
            }

            if !order.client_order_id.is_empty() {
                indices
                    .by_client_order_id
                    .insert(order.client_order_id.clone(), order.order_id.clone());
            }
            indices
                .by_order_id
                .insert(order.order_id.clone(), order.clone());
        }

        self.dispatch(&order);
        Ok(())
    }

    /// Stop tracking an order, clearing both indices.
    pub fn remove(&self, order_id: &str) -> Option<Order> {
        let mut indices = self.indices.lock();
        let order = indices.by_order_id.remove(order_id)?;
        indices.by_client_order_id.remove(&order.client_order_id);
        debug!(order_id, "Order removed from registry");
        Some(order)
    }

    #[must_use]
    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.indices.lock().by_order_id.get(order_id).cloned()
    }

    #[must_use]
    pub fn get_by_client_id(&self, client_order_id: &str) -> Option<Order> {
        let indices = self.indices.lock();
        let order_id = indices.by_client_order_id.get(client_order_id)?;
        indices.by_order_id.get(order_id).cloned()
    }

    /// Orders that can still fill: status `NEW` or `PARTIALLY_FILLED`.
    #[must_use]
    pub fn open_orders(&self, symbol: Option<&str>) -> Vec<Order> {
        self.indices
            .lock()
            .by_order_id
            .values()
            .filter(|o| o.is_active())
            .filter(|o| symbol.map_or(true, |s| o.symbol == s))
            .cloned()
            .collect()
    }

    /// Every tracked order, optionally filtered by symbol.
    #[must_use]
    pub fn all_orders(&self, symbol: Option<&str>) -> Vec<Order> {
        self.indices
            .lock()
            .by_order_id
            .values()
            .filter(|o| symbol.map_or(true, |s| o.symbol == s))
            .cloned()
            .collect()
    }

    /// Drop every terminal order and return how many were dropped.
    pub fn clear_terminal(&self) -> usize {
        let terminal_ids: Vec<String> = {
            let indices = self.indices.lock();
            indices
                .by_order_id
                .values()
                .filter(|o| o.is_terminal())
                .map(|o| o.order_id.clone())
                .collect()
        };
        for order_id in &terminal_ids {
            self.remove(order_id);
        }
        if !terminal_ids.is_empty() {
            info!(count = terminal_ids.len(), "Cleared terminal orders");
        }
        terminal_ids.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.lock().by_order_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.lock().by_order_id.is_empty()
    }

    #[must_use]
    pub fn active_len(&self) -> usize {
        self.indices
            .lock()
            .by_order_id
            .values()
            .filter(|o| o.is_active())
            .count()
    }

    fn dispatch(&self, order: &Order) {
        let callbacks = self.callbacks.read().clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(order))).is_err() {
                error!(order_id = %order.order_id, "Order callback panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderSide, OrderStatus, OrderType, TimeInForce};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn order(id: &str, client_id: &str, status: OrderStatus) -> Order {
        Order {
            order_id: id.into(),
            client_order_id: client_id.into(),
            symbol: "BTC/USDT".into(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            status,
            qty: dec!(0.002),
            executed_qty: dec!(0),
            price: Some(dec!(57000)),
            stop_price: None,
            avg_fill_price: dec!(0),
            commission: dec!(0),
            commission_asset: String::new(),
            time_in_force: TimeInForce::Gtc,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::New)).unwrap();
        let err = registry.add(order("1", "c1", OrderStatus::New)).unwrap_err();
        assert!(matches!(err, ExchangeError::AlreadyExists(_)));
    }

    #[test]
    fn both_indices_agree() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::New)).unwrap();

        let by_id = registry.get("1").unwrap();
        let by_client = registry.get_by_client_id("c1").unwrap();
        assert_eq!(by_id, by_client);

        registry.remove("1");
        assert!(registry.get("1").is_none());
        assert!(registry.get_by_client_id("c1").is_none());
    }

    #[test]
    fn update_of_unknown_order_adds_it() {
        let registry = OrderRegistry::new();
        registry
            .update(order("7", "c7", OrderStatus::New))
            .unwrap();
        assert!(registry.get("7").is_some());
    }

    #[test]
    fn update_validates_transition() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::Filled)).unwrap();

        let err = registry
            .update(order("1", "c1", OrderStatus::New))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidTransition { .. }));
        // Registry unchanged.
        assert_eq!(registry.get("1").unwrap().status, OrderStatus::Filled);
    }

    #[test]
    fn self_transition_refreshes_fields() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::New)).unwrap();

        let mut refreshed = order("1", "c1", OrderStatus::New);
        refreshed.executed_qty = dec!(0.001);
        registry.update(refreshed).unwrap();
        assert_eq!(registry.get("1").unwrap().executed_qty, dec!(0.001));
    }

    #[test]
    fn open_orders_returns_exactly_active_statuses() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::New)).unwrap();
        registry
            .add(order("2", "c2", OrderStatus::PartiallyFilled))
            .unwrap();
        registry.add(order("3", "c3", OrderStatus::Filled)).unwrap();
        registry
            .add(order("4", "c4", OrderStatus::PendingNew))
            .unwrap();
        registry
            .add(order("5", "c5", OrderStatus::PendingCancel))
            .unwrap();

        let mut open: Vec<String> = registry
            .open_orders(None)
            .into_iter()
            .map(|o| o.order_id)
            .collect();
        open.sort();
        assert_eq!(open, ["1", "2"]);
    }

    #[test]
    fn open_orders_filters_by_symbol() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::New)).unwrap();
        let mut eth = order("2", "c2", OrderStatus::New);
        eth.symbol = "ETH/USDT".into();
        registry.add(eth).unwrap();

        assert_eq!(registry.open_orders(Some("ETH/USDT")).len(), 1);
        assert_eq!(registry.open_orders(None).len(), 2);
    }

    #[test]
    fn clear_terminal_drops_only_terminal() {
        let registry = OrderRegistry::new();
        registry.add(order("1", "c1", OrderStatus::New)).unwrap();
        registry.add(order("2", "c2", OrderStatus::Filled)).unwrap();
        registry
            .add(order("3", "c3", OrderStatus::Canceled))
            .unwrap();

        assert_eq!(registry.clear_terminal(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("1").is_some());
    }

    #[test]
    fn callbacks_run_in_order_and_survive_panics() {
        let registry = OrderRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&seen);
        registry.register_callback(Arc::new(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
        }));
        registry.register_callback(Arc::new(|_| panic!("subscriber bug")));
        let third = Arc::clone(&seen);
        registry.register_callback(Arc::new(move |_| {
            third.fetch_add(10, Ordering::SeqCst);
        }));

        registry.add(order("1", "c1", OrderStatus::New)).unwrap();
        // First and third both observed the event despite the panic in
        // the middle.
        assert_eq!(seen.load(Ordering::SeqCst), 11);
    }
}
