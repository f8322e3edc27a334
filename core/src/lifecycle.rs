//! Order status state machine.
//!
//! Every status change, whoever asks for it, goes through [`ensure_transition`].
//! The adjacency table is the only place that knows which moves are legal:
//!
//! ```text
//! pending ──► confirmed ──► preparing ──► on_the_way ──► delivered
//!    │            │             │
//!    └────────────┴─────────────┴──────► cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal. Cancellation is not possible once
//! the order is on its way.

use crate::error::OrderError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, waiting for a driver to claim it.
    Pending,
    /// Claimed by a driver.
    Confirmed,
    /// Being prepared for pickup.
    Preparing,
    /// Picked up and travelling to the customer.
    OnTheWay,
    /// Handed over to the customer.
    Delivered,
    /// Cancelled by the customer, the driver or an admin.
    #[serde(alias = "canceled")]
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::OnTheWay,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Statuses in which a driver is actively working the order.
    pub const IN_FLIGHT: [Self; 3] = [Self::Confirmed, Self::Preparing, Self::OnTheWay];

    /// Statuses from which an order may be cancelled, by any actor.
    pub const CANCELLABLE: [Self; 3] = [Self::Pending, Self::Confirmed, Self::Preparing];

    /// Convert status to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OnTheWay => "on_the_way",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status from its storage representation.
    ///
    /// Both `cancelled` and the legacy `canceled` spelling are accepted.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "preparing" => Some(Self::Preparing),
            "on_the_way" => Some(Self::OnTheWay),
            "delivered" => Some(Self::Delivered),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns `true` for `delivered` and `cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses reachable from `self` in a single step.
    #[must_use]
    pub const fn allowed_next(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Preparing, Self::Cancelled],
            Self::Preparing => &[Self::OnTheWay, Self::Cancelled],
            Self::OnTheWay => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Returns `true` if `self -> next` is a legal single step.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    /// The milestone timestamp stamped when an order enters this status.
    #[must_use]
    pub const fn milestone(&self) -> Option<Milestone> {
        match self {
            Self::Pending => None,
            Self::Confirmed => Some(Milestone::Confirmed),
            Self::Preparing => Some(Milestone::Preparing),
            Self::OnTheWay => Some(Milestone::OnTheWay),
            Self::Delivered => Some(Milestone::Delivered),
            Self::Cancelled => Some(Milestone::Cancelled),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamp column set once, the first time an order reaches a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    /// `assigned_at`: a driver was bound to the order.
    Assigned,
    /// `confirmed_at`
    Confirmed,
    /// `preparing_at`
    Preparing,
    /// `on_the_way_at`
    OnTheWay,
    /// `delivered_at`
    Delivered,
    /// `canceled_at`
    Cancelled,
}

impl Milestone {
    /// Column name in the `orders` table.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned_at",
            Self::Confirmed => "confirmed_at",
            Self::Preparing => "preparing_at",
            Self::OnTheWay => "on_the_way_at",
            Self::Delivered => "delivered_at",
            Self::Cancelled => "canceled_at",
        }
    }
}

/// Validate a single status step against the adjacency table.
///
/// # Errors
///
/// Returns [`OrderError::InvalidTransition`] when `to` is not reachable from
/// `from` in one step, including every move out of a terminal status.
pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = OrderStatus> {
        proptest::sample::select(OrderStatus::ALL.to_vec())
    }

    #[test]
    fn happy_path_is_legal() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::OnTheWay,
            OrderStatus::Delivered,
        ];
        for pair in path.windows(2) {
            assert!(ensure_transition(pair[0], pair[1]).is_ok(), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn cancel_is_not_possible_once_on_the_way() {
        assert!(ensure_transition(OrderStatus::Preparing, OrderStatus::Cancelled).is_ok());
        assert!(matches!(
            ensure_transition(OrderStatus::OnTheWay, OrderStatus::Cancelled),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn skipping_a_step_is_rejected() {
        let err = ensure_transition(OrderStatus::Confirmed, OrderStatus::OnTheWay)
            .expect_err("skip should fail");
        assert_eq!(err.to_string(), "Cannot transition from confirmed to on_the_way");
    }

    #[test]
    fn storage_representation_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("canceled"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn serde_uses_snake_case_and_accepts_legacy_spelling() {
        let json = serde_json::to_string(&OrderStatus::OnTheWay).unwrap();
        assert_eq!(json, "\"on_the_way\"");
        let parsed: Result<OrderStatus, _> = serde_json::from_str("\"canceled\"");
        assert!(matches!(parsed, Ok(OrderStatus::Cancelled)));
    }

    #[test]
    fn cancellable_set_matches_the_table() {
        for status in OrderStatus::ALL {
            assert_eq!(
                OrderStatus::CANCELLABLE.contains(&status),
                status.can_transition_to(OrderStatus::Cancelled)
            );
        }
    }

    proptest! {
        #[test]
        fn terminal_states_have_no_exit(from in status_strategy(), to in status_strategy()) {
            if from.is_terminal() {
                prop_assert!(ensure_transition(from, to).is_err());
            }
        }

        #[test]
        fn transitions_outside_the_table_are_rejected(from in status_strategy(), to in status_strategy()) {
            let result = ensure_transition(from, to);
            prop_assert_eq!(result.is_ok(), from.allowed_next().contains(&to));
        }

        #[test]
        fn no_self_loops(status in status_strategy()) {
            prop_assert!(!status.can_transition_to(status));
        }
    }
}
