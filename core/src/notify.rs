//! Order lifecycle notifications.
//!
//! The service emits an [`OrderEvent`] after each successful write. Delivery
//! (push, email, SMS) belongs to whoever implements [`OrderNotifier`].

use crate::lifecycle::OrderStatus;
use crate::order::{OrderId, OrderType, UserId};

/// Something that happened to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// A customer placed an order.
    Created {
        /// The new order.
        order_id: OrderId,
        /// Its owner.
        customer_id: UserId,
        /// Its type.
        order_type: OrderType,
    },
    /// A driver was bound to an order.
    Assigned {
        /// The order.
        order_id: OrderId,
        /// The driver.
        driver_id: UserId,
    },
    /// An order changed status.
    StatusChanged {
        /// The order.
        order_id: OrderId,
        /// Previous status.
        from: OrderStatus,
        /// New status.
        to: OrderStatus,
    },
}

/// Receives order events. Must not block.
pub trait OrderNotifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: &OrderEvent);
}

/// Notifier that writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl OrderNotifier for TracingNotifier {
    fn notify(&self, event: &OrderEvent) {
        match event {
            OrderEvent::Created {
                order_id,
                customer_id,
                order_type,
            } => tracing::info!(
                order_id = %order_id,
                customer_id = %customer_id,
                order_type = %order_type,
                "Order created"
            ),
            OrderEvent::Assigned {
                order_id,
                driver_id,
            } => tracing::info!(order_id = %order_id, driver_id = %driver_id, "Order assigned"),
            OrderEvent::StatusChanged { order_id, from, to } => {
                tracing::info!(order_id = %order_id, from = %from, to = %to, "Order status changed");
            }
        }
    }
}
