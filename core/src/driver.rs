//! Driver eligibility.
//!
//! Drivers are users with the `employer` role. The subset of their profile
//! that decides whether they may claim orders lives here, together with the
//! [`DriverDirectory`] collaborator that reads and updates it.

use crate::order::UserId;
use crate::store::StoreFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account status of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    /// Registered, waiting for review.
    Pending,
    /// Approved by an admin.
    Approved,
    /// Approved and working.
    Active,
    /// Application rejected.
    Rejected,
    /// Temporarily blocked.
    Suspended,
}

impl DriverStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
        }
    }

    /// Parse from the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "active" => Some(Self::Active),
            "rejected" => Some(Self::Rejected),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Approved and active drivers may receive orders.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Approved | Self::Active)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eligibility-relevant part of a driver profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    /// Driver user id.
    pub id: UserId,
    /// Account status.
    pub status: DriverStatus,
    /// Driver toggled online.
    pub is_online: bool,
    /// Driver toggled available.
    pub is_available: bool,
}

impl DriverProfile {
    /// Whether the driver may claim an order right now.
    #[must_use]
    pub const fn can_accept_orders(&self) -> bool {
        self.status.is_eligible() && self.is_online && self.is_available
    }

    /// Apply an admin status change. Eligible statuses bring the driver
    /// online and available, anything else takes them offline.
    #[must_use]
    pub const fn with_status(self, status: DriverStatus) -> Self {
        let on = status.is_eligible();
        Self {
            status,
            is_online: on,
            is_available: on,
            ..self
        }
    }
}

/// Lookup and update of driver profiles.
///
/// Profiles are owned by the user directory; the order core only reads
/// eligibility and lets admins change the account status.
pub trait DriverDirectory: Send + Sync {
    /// Find a driver by user id. Users without the driver role are `None`.
    fn find_driver(&self, id: UserId) -> StoreFuture<'_, Option<DriverProfile>>;

    /// Persist a profile produced by [`DriverProfile::with_status`].
    fn save_driver(&self, profile: DriverProfile) -> StoreFuture<'_, DriverProfile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(status: DriverStatus, online: bool, available: bool) -> DriverProfile {
        DriverProfile {
            id: UserId::new(7),
            status,
            is_online: online,
            is_available: available,
        }
    }

    #[test]
    fn only_eligible_online_available_drivers_can_accept() {
        assert!(profile(DriverStatus::Approved, true, true).can_accept_orders());
        assert!(profile(DriverStatus::Active, true, true).can_accept_orders());
        assert!(!profile(DriverStatus::Active, false, true).can_accept_orders());
        assert!(!profile(DriverStatus::Active, true, false).can_accept_orders());
        assert!(!profile(DriverStatus::Pending, true, true).can_accept_orders());
        assert!(!profile(DriverStatus::Suspended, true, true).can_accept_orders());
    }

    #[test]
    fn status_change_toggles_availability() {
        let approved = profile(DriverStatus::Pending, false, false).with_status(DriverStatus::Approved);
        assert!(approved.is_online && approved.is_available);

        let suspended = approved.with_status(DriverStatus::Suspended);
        assert!(!suspended.is_online && !suspended.is_available);
    }
}
