//! Reconciliation between the local registry and the venue's view.
//!
//! The venue is the source of truth. Reconciliation pulls its open
//! orders, diffs them against the registry, and converges the registry:
//! strays are adopted, vanished orders are re-queried for their terminal
//! status, and mismatched statuses are overwritten.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{error, info, warn};

use super::registry::OrderRegistry;
use crate::gateway::{ExchangeGateway, OrderSelector};
use crate::error::Result;

/// Outcome of one [`Reconciler::reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Open orders the venue reported.
    pub exchange_open: usize,
    /// Open orders the registry held going in.
    pub local_open: usize,
    /// Venue orders the registry did not know (strays).
    pub missing_locally: usize,
    /// Registry orders the venue no longer lists.
    pub missing_on_exchange: usize,
    /// Ids known to both sides.
    pub common: usize,
    /// Registry mutations this pass performed.
    pub updates_applied: usize,
}

/// Outcome of one [`Reconciler::sync_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub exchange_open: usize,
    pub local_before: usize,
    pub added: usize,
    pub updated: usize,
    pub local_after: usize,
}

/// Converges an [`OrderRegistry`] on the venue's authoritative state.
pub struct Reconciler {
    registry: Arc<OrderRegistry>,
    gateway: Arc<dyn ExchangeGateway>,
}

impl Reconciler {
    #[must_use]
    pub fn new(registry: Arc<OrderRegistry>, gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { registry, gateway }
    }

    /// Reconcile open orders for `symbol`, or all symbols when `None`.
    ///
    /// Runs three passes over the id sets: venue-only ids are inserted
    /// from the venue record; local-only ids are re-queried and updated
    /// with the authoritative status (left in place when the query
    /// fails); shared ids with differing statuses are overwritten with
    /// the venue record. Running it twice with no venue-side change
    /// applies zero updates the second time.
    ///
    /// # Errors
    ///
    /// Fails only when the venue's open-order listing itself fails;
    /// per-order divergences are logged and counted, never fatal.
    pub async fn reconcile(&self, symbol: Option<&str>) -> Result<ReconcileReport> {
        info!(symbol = symbol.unwrap_or("all"), "Starting order reconciliation");

        let exchange_orders = self.gateway.get_open_orders(symbol).await?;
        let local_orders = self.registry.open_orders(symbol);

        let exchange_by_id: HashMap<&str, _> = exchange_orders
            .iter()
            .map(|o| (o.order_id.as_str(), o))
            .collect();
        let local_by_id: HashMap<&str, _> = local_orders
            .iter()
            .map(|o| (o.order_id.as_str(), o))
            .collect();
        let exchange_ids: HashSet<&str> = exchange_by_id.keys().copied().collect();
        let local_ids: HashSet<&str> = local_by_id.keys().copied().collect();

        let mut report = ReconcileReport {
            exchange_open: exchange_orders.len(),
            local_open: local_orders.len(),
            ..Default::default()
        };

        // Stray on venue: adopt the venue record.
        for id in exchange_ids.difference(&local_ids) {
            let order = (*exchange_by_id[id]).clone();
            report.missing_locally += 1;
            warn!(
                order_id = %order.order_id,
                symbol = %order.symbol,
                side = %order.side,
                "Adopting stray order from venue"
            );
            match self.registry.update(order) {
                Ok(()) => report.updates_applied += 1,
                Err(e) => error!(order_id = %id, error = %e, "Failed to adopt stray order"),
            }
        }

        // Present locally, absent on venue: ask the venue what became of
        // it. Usually FILLED, CANCELED, or EXPIRED.
        for id in local_ids.difference(&exchange_ids) {
            report.missing_on_exchange += 1;
            let local = local_by_id[id];
            warn!(
                order_id = %id,
                symbol = %local.symbol,
                status = %local.status,
                "Local order absent on venue, querying authoritative status"
            );
            match self
                .gateway
                .get_order_status(&local.symbol, OrderSelector::by_id(*id))
                .await
            {
                Ok(authoritative) => match self.registry.update(authoritative) {
                    Ok(()) => report.updates_applied += 1,
                    Err(e) => {
                        error!(order_id = %id, error = %e, "Failed to apply authoritative status");
                    }
                },
                // Leave it in place; the next pass will retry.
                Err(e) => error!(order_id = %id, error = %e, "Failed to query order status"),
            }
        }

        // Known to both: overwrite on status mismatch.
        for id in exchange_ids.intersection(&local_ids) {
            report.common += 1;
            let venue_order = exchange_by_id[id];
            let local = local_by_id[id];
            if local.status != venue_order.status {
                info!(
                    order_id = %id,
                    old_status = %local.status,
                    new_status = %venue_order.status,
                    "Overwriting local order with venue record"
                );
                match self.registry.update((*venue_order).clone()) {
                    Ok(()) => report.updates_applied += 1,
                    Err(e) => error!(order_id = %id, error = %e, "Failed to update order"),
                }
            }
        }

        info!(
            exchange_open = report.exchange_open,
            local_open = report.local_open,
            missing_locally = report.missing_locally,
            missing_on_exchange = report.missing_on_exchange,
            common = report.common,
            updates_applied = report.updates_applied,
            "Order reconciliation complete"
        );
        Ok(report)
    }

    /// One-pass synchronization across every symbol: adopt unknown venue
    /// orders, overwrite mismatched ones.
    ///
    /// # Errors
    ///
    /// Fails only when the venue's open-order listing fails.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        info!("Starting full order synchronization");

        let exchange_orders = self.gateway.get_open_orders(None).await?;
        let mut report = SyncReport {
            exchange_open: exchange_orders.len(),
            local_before: self.registry.len(),
            ..Default::default()
        };

        for venue_order in exchange_orders {
            match self.registry.get(&venue_order.order_id) {
                None => match self.registry.add(venue_order) {
                    Ok(()) => report.added += 1,
                    Err(e) => error!(error = %e, "Failed to add order during sync"),
                },
                Some(local) if local.status != venue_order.status => {
                    match self.registry.update(venue_order) {
                        Ok(()) => report.updated += 1,
                        Err(e) => error!(error = %e, "Failed to update order during sync"),
                    }
                }
                Some(_) => {}
            }
        }

        report.local_after = self.registry.len();
        info!(
            exchange_open = report.exchange_open,
            local_before = report.local_before,
            added = report.added,
            updated = report.updated,
            local_after = report.local_after,
            "Full order synchronization complete"
        );
        Ok(report)
    }

    /// Cancel every venue order the registry does not track.
    ///
    /// This kills orders placed by other processes sharing the account.
    /// Gate it behind explicit operator confirmation.
    ///
    /// # Errors
    ///
    /// Fails only when the venue's open-order listing fails; individual
    /// cancel failures are logged and skipped.
    pub async fn cancel_stray(&self, symbol: Option<&str>) -> Result<usize> {
        warn!(symbol = symbol.unwrap_or("all"), "Canceling stray venue orders");

        let exchange_orders = self.gateway.get_open_orders(symbol).await?;
        let local_ids: HashSet<String> = self
            .registry
            .open_orders(symbol)
            .into_iter()
            .map(|o| o.order_id)
            .collect();

        let mut canceled = 0;
        for order in exchange_orders {
            if local_ids.contains(&order.order_id) {
                continue;
            }
            match self
                .gateway
                .cancel_order(&order.symbol, OrderSelector::by_id(order.order_id.clone()))
                .await
            {
                Ok(()) => {
                    canceled += 1;
                    info!(order_id = %order.order_id, symbol = %order.symbol, "Canceled stray order");
                }
                Err(e) => {
                    error!(order_id = %order.order_id, error = %e, "Failed to cancel stray order");
                }
            }
        }

        info!(canceled, "Stray order cancellation complete");
        Ok(canceled)
    }
}
