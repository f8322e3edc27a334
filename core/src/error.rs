//! Error taxonomy for order operations.

use crate::lifecycle::OrderStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field-level validation messages, keyed by field path (`items.0.quantity`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Create an empty error map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map holding a single message.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns `true` when no message was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns `true` when `field` has at least one message.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// First recorded message, in field order.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the map itself when it holds any message.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_message() {
            Some(message) => f.write_str(message),
            None => f.write_str("no validation errors"),
        }
    }
}

/// Errors reported by storage and collaborator adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be mapped to a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Errors returned by order operations.
#[derive(Error, Debug)]
pub enum OrderError {
    /// Input failed validation. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The resource does not exist or is outside the caller's scope.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of resource.
        resource: &'static str,
        /// Requested id.
        id: i64,
    },

    /// The caller lacks the role or relationship the operation needs.
    #[error("{0}")]
    Forbidden(String),

    /// The order is not in a state that allows the operation.
    #[error("{0}")]
    StateConflict(String),

    /// A status change outside the adjacency table.
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// The order already carries a rating.
    #[error("You have already rated this order.")]
    AlreadyRated,

    /// Only store orders can be rated.
    #[error("Cannot rate: store information is missing for this order.")]
    MissingStore,

    /// Store order outside the delivery radius.
    #[error("Delivery is only available within {max_km} km. Your distance is {distance_km:.2} km.")]
    DistanceExceeded {
        /// Computed customer-to-store distance.
        distance_km: f64,
        /// Configured maximum.
        max_km: f64,
    },

    /// Storage failure. Any partial write was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl OrderError {
    /// Shorthand for an order that is missing or not visible.
    #[must_use]
    pub const fn order_not_found(id: i64) -> Self {
        Self::NotFound {
            resource: "Order",
            id,
        }
    }

    /// Returns `true` for the state-conflict family.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::StateConflict(_) | Self::InvalidTransition { .. })
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<ValidationErrors> for OrderError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_message_rounds_to_two_decimals() {
        let err = OrderError::DistanceExceeded {
            distance_km: 18.456,
            max_km: 17.0,
        };
        assert_eq!(
            err.to_string(),
            "Delivery is only available within 17 km. Your distance is 18.46 km."
        );
    }

    #[test]
    fn validation_errors_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("items", "The items field is required.");
        errors.add("phone", "The phone field is required.");
        errors.add("phone", "The phone may not be greater than 20 characters.");

        assert_eq!(errors.get("phone").map(<[String]>::len), Some(2));
        assert_eq!(errors.first_message(), Some("The items field is required."));
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn store_errors_become_persistence_errors() {
        let err: OrderError = StoreError::Database("connection reset".into()).into();
        assert!(matches!(err, OrderError::Persistence(ref m) if m.contains("connection reset")));
    }
}
