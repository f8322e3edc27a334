//! The authenticated caller of an operation.
//!
//! Identity is established upstream. Every service operation receives the
//! actor explicitly; nothing is read from ambient state.

use crate::error::OrderError;
use crate::order::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Places and tracks orders.
    Customer,
    /// Delivery driver.
    Employer,
    /// Back-office operator.
    Admin,
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Employer => "employer",
            Self::Admin => "admin",
        }
    }

    /// Parse from the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "employer" => Some(Self::Employer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated user acting on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User id.
    pub id: UserId,
    /// User role.
    pub role: Role,
}

impl Actor {
    /// Create a new actor.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Shorthand for a customer actor.
    #[must_use]
    pub const fn customer(id: i64) -> Self {
        Self::new(UserId::new(id), Role::Customer)
    }

    /// Shorthand for a driver actor.
    #[must_use]
    pub const fn driver(id: i64) -> Self {
        Self::new(UserId::new(id), Role::Employer)
    }

    /// Shorthand for an admin actor.
    #[must_use]
    pub const fn admin(id: i64) -> Self {
        Self::new(UserId::new(id), Role::Admin)
    }

    /// Require the actor to hold `role`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for any other role.
    pub fn require(&self, role: Role) -> Result<(), OrderError> {
        if self.role == role {
            Ok(())
        } else {
            Err(OrderError::Forbidden(format!(
                "This action requires the {role} role"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_other_roles() {
        assert!(Actor::customer(1).require(Role::Customer).is_ok());
        assert!(matches!(
            Actor::driver(1).require(Role::Admin),
            Err(OrderError::Forbidden(_))
        ));
    }

    #[test]
    fn role_roundtrip() {
        for role in [Role::Customer, Role::Employer, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("driver"), None);
    }
}
