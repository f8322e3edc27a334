//! The order aggregate and its line items.

use crate::geo::GeoPoint;
use crate::lifecycle::{Milestone, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The raw database id.
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Order identifier.
    OrderId
);
id_type!(
    /// Line item identifier.
    ItemId
);
id_type!(
    /// User identifier, shared by customers, drivers and admins.
    UserId
);
id_type!(
    /// Catalog store identifier.
    StoreId
);
id_type!(
    /// Catalog product identifier.
    ProductId
);

/// Kind of order, which decides the meaningful address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Store order: items come from a catalog store.
    Regular,
    /// Point-to-point delivery of free-form items.
    CustomDelivery,
    /// Water delivery from a water station.
    WaterTank,
}

impl OrderType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::CustomDelivery => "custom_delivery",
            Self::WaterTank => "water_tank",
        }
    }

    /// Parse from the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Self::Regular),
            "custom_delivery" => Some(Self::CustomDelivery),
            "water_tank" => Some(Self::WaterTank),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a line item is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Backed by a catalog product.
    Product,
    /// Free-form item named by the customer.
    Custom,
    /// Water-tank line, reported separately.
    WaterTank,
}

impl ItemKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Custom => "custom",
            Self::WaterTank => "water_tank",
        }
    }

    /// Parse from the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "product" => Some(Self::Product),
            "custom" => Some(Self::Custom),
            "water_tank" => Some(Self::WaterTank),
            _ => None,
        }
    }
}

/// A line item owned by exactly one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item id.
    pub id: ItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// Item kind marker.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Catalog product, for [`ItemKind::Product`] items.
    pub product_id: Option<ProductId>,
    /// Free-form name, for custom and water-tank items.
    pub custom_name: Option<String>,
    /// Quantity, at least 1.
    pub quantity: u32,
    /// Unit price snapshot taken when the order was placed.
    pub price: Decimal,
    /// Optional handling notes.
    pub special_instructions: Option<String>,
}

impl OrderItem {
    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Milestone timestamps. Each is set once and never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    /// A driver was bound to the order.
    pub assigned_at: Option<DateTime<Utc>>,
    /// Order entered `confirmed`.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Order entered `preparing`.
    pub preparing_at: Option<DateTime<Utc>>,
    /// Order entered `on_the_way`.
    pub on_the_way_at: Option<DateTime<Utc>>,
    /// Order entered `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Order entered `cancelled`.
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Milestones {
    /// Read a milestone.
    #[must_use]
    pub const fn get(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        match milestone {
            Milestone::Assigned => self.assigned_at,
            Milestone::Confirmed => self.confirmed_at,
            Milestone::Preparing => self.preparing_at,
            Milestone::OnTheWay => self.on_the_way_at,
            Milestone::Delivered => self.delivered_at,
            Milestone::Cancelled => self.canceled_at,
        }
    }

    /// Stamp `milestone` with `at` unless it is already set.
    pub fn stamp(&mut self, milestone: Milestone, at: DateTime<Utc>) {
        let slot = match milestone {
            Milestone::Assigned => &mut self.assigned_at,
            Milestone::Confirmed => &mut self.confirmed_at,
            Milestone::Preparing => &mut self.preparing_at,
            Milestone::OnTheWay => &mut self.on_the_way_at,
            Milestone::Delivered => &mut self.delivered_at,
            Milestone::Cancelled => &mut self.canceled_at,
        };
        slot.get_or_insert(at);
    }
}

/// Last known driver position on an in-flight order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTracking {
    /// Latest reported position.
    pub position: GeoPoint,
    /// When it was reported.
    pub updated_at: DateTime<Utc>,
}

/// The order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order id.
    pub id: OrderId,
    /// Owning customer. Immutable.
    #[serde(rename = "user_id")]
    pub customer_id: UserId,
    /// Assigned driver, if any.
    pub employer_id: Option<UserId>,
    /// Source store, for store orders.
    pub store_id: Option<StoreId>,
    /// Order classification.
    pub order_type: OrderType,
    /// Current status.
    pub status: OrderStatus,
    /// Delivery address.
    pub address: String,
    /// Delivery coordinates.
    pub destination: Option<GeoPoint>,
    /// Pickup address (custom delivery origin or water station).
    pub pickup_address: Option<String>,
    /// Pickup coordinates.
    pub pickup: Option<GeoPoint>,
    /// Sum of item line totals.
    pub subtotal: Decimal,
    /// Delivery fee.
    pub delivery_fee: Decimal,
    /// `subtotal + delivery_fee`.
    pub total: Decimal,
    /// Payment method label. No payment is processed.
    pub payment_method: String,
    /// Contact phone.
    pub phone: String,
    /// Customer notes.
    pub notes: Option<String>,
    /// Customer-to-store distance, or the caller-supplied distance.
    pub distance_km: Option<f64>,
    /// Milestone timestamps.
    #[serde(flatten)]
    pub milestones: Milestones,
    /// Live driver position.
    pub tracking: Option<DeliveryTracking>,
    /// Store rating, once rated.
    pub rating: Option<u8>,
    /// Review text, once rated.
    pub review: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Line items, in insertion order.
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Returns `true` once a rating has been attached.
    #[must_use]
    pub const fn is_rated(&self) -> bool {
        self.rating.is_some()
    }

    /// Returns `true` if `driver` is the assigned driver.
    #[must_use]
    pub fn is_assigned_to(&self, driver: UserId) -> bool {
        self.employer_id == Some(driver)
    }
}

/// A one-time store rating attached to a delivered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Rating id.
    pub id: i64,
    /// Rated order.
    pub order_id: OrderId,
    /// Customer who rated.
    pub customer_id: UserId,
    /// Rated store.
    pub store_id: StoreId,
    /// Score, `1..=5`.
    pub rating: u8,
    /// Optional review text.
    pub review: Option<String>,
    /// When the rating was given.
    pub created_at: DateTime<Utc>,
}
