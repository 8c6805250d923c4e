//! Order lifecycle state machine.

use crate::domain::OrderStatus;
use crate::error::{ExchangeError, Result};

/// Validates order status transitions.
///
/// ```text
/// PENDING_NEW      -> NEW | REJECTED
/// NEW              -> PARTIALLY_FILLED | FILLED | PENDING_CANCEL | CANCELED | EXPIRED
/// PARTIALLY_FILLED -> FILLED | PENDING_CANCEL | CANCELED
/// PENDING_CANCEL   -> CANCELED
/// FILLED | CANCELED | REJECTED | EXPIRED -> (terminal)
/// ```
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Whether the lifecycle permits moving from `from` to `to`.
    /// Self-transitions are not transitions; they are field refreshes and
    /// bypass this check entirely.
    #[must_use]
    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::{
            Canceled, Expired, Filled, New, PartiallyFilled, PendingCancel, PendingNew, Rejected,
        };
        matches!(
            (from, to),
            (PendingNew, New | Rejected)
                | (New, PartiallyFilled | Filled | PendingCancel | Canceled | Expired)
                | (PartiallyFilled, Filled | PendingCancel | Canceled)
                | (PendingCancel, Canceled)
        )
    }

    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidTransition`] when the lifecycle
    /// forbids the move.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(ExchangeError::InvalidTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus::{
        Canceled, Expired, Filled, New, PartiallyFilled, PendingCancel, PendingNew, Rejected,
    };

    const ALL: [OrderStatus; 8] = [
        PendingNew,
        New,
        PartiallyFilled,
        Filled,
        PendingCancel,
        Canceled,
        Rejected,
        Expired,
    ];

    #[test]
    fn transition_table_is_exact() {
        let allowed = [
            (PendingNew, New),
            (PendingNew, Rejected),
            (New, PartiallyFilled),
            (New, Filled),
            (New, PendingCancel),
            (New, Canceled),
            (New, Expired),
            (PartiallyFilled, Filled),
            (PartiallyFilled, PendingCancel),
            (PartiallyFilled, Canceled),
            (PendingCancel, Canceled),
        ];
        // Every (from, to) pair either appears in the table or is
        // rejected; nothing else sneaks through.
        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    OrderStateMachine::can_transition(from, to),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        for from in [Filled, Canceled, Rejected, Expired] {
            for to in ALL {
                assert!(!OrderStateMachine::can_transition(from, to));
            }
        }
    }

    #[test]
    fn validate_names_both_states() {
        let err = OrderStateMachine::validate_transition(Filled, New).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("FILLED"));
        assert!(rendered.contains("NEW"));
    }
}
