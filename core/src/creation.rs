//! Order creation policies.
//!
//! The three order types share one creation path. Each request type knows how
//! to validate its own fields and normalize them into an [`OrderDraft`]; the
//! service then resolves catalog prices, enforces the delivery radius, prices
//! the draft and inserts it in a single transaction.
//!
//! Totals are always recomputed here: `subtotal = Σ price × quantity` and
//! `total = subtotal + delivery_fee`. Figures sent by the client are only
//! compared against the computed ones.

use crate::error::ValidationErrors;
use crate::geo::{self, GeoPoint};
use crate::order::{ItemKind, OrderType, ProductId, StoreId, UserId};
use crate::store::{NewOrder, NewOrderItem};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

const MAX_NAME_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 1000;
pub(crate) const MAX_INSTRUCTIONS_LEN: usize = 500;
pub(crate) const MAX_REVIEW_LEN: usize = 500;
const MAX_ADDRESS_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 1000;
const MAX_PHONE_LEN: usize = 20;
const WATER_TANK_PAYMENT_METHODS: [&str; 2] = ["cash_on_delivery", "online"];

/// Largest amount a money column holds: `NUMERIC(10,2)`, i.e. 99999999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x540B_E3FF, 2, 0, false, 2);

/// Largest line-item quantity (the `INTEGER` column bound).
pub const MAX_QUANTITY: u32 = 2_147_483_647;

/// A line item of a store order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreItemRequest {
    /// Catalog product. Exclusive with `custom_name`.
    pub product_id: Option<i64>,
    /// Free-form item name. Exclusive with `product_id`.
    pub custom_name: Option<String>,
    /// Quantity, at least 1.
    pub quantity: Option<i64>,
    /// Unit price. Required for free-form items; catalog items use the catalog price.
    pub price: Option<Decimal>,
    /// Handling notes.
    pub special_instructions: Option<String>,
}

/// Request to place an order from a catalog store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreOrderRequest {
    /// Store to order from.
    pub store_id: Option<i64>,
    /// Delivery address.
    pub address: Option<String>,
    /// Delivery latitude.
    pub latitude: Option<f64>,
    /// Delivery longitude.
    pub longitude: Option<f64>,
    /// Line items.
    pub items: Option<Vec<StoreItemRequest>>,
    /// Client-computed subtotal, cross-checked only.
    pub subtotal: Option<Decimal>,
    /// Client-computed total, cross-checked only.
    pub total: Option<Decimal>,
    /// Delivery fee.
    pub delivery_fee: Option<Decimal>,
    /// Payment method label.
    pub payment_method: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Customer notes.
    pub notes: Option<String>,
    /// Client-computed distance. The server computes its own.
    pub distance: Option<f64>,
}

/// A line item of a custom delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomItemRequest {
    /// What to pick up.
    pub description: Option<String>,
    /// Quantity, at least 1.
    pub quantity: Option<i64>,
    /// Unit price, defaults to zero.
    pub price: Option<Decimal>,
    /// Handling notes.
    pub special_instructions: Option<String>,
}

/// Request for a point-to-point delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomDeliveryRequest {
    /// Pickup address.
    pub pickup_address: Option<String>,
    /// Pickup latitude.
    pub pickup_latitude: Option<f64>,
    /// Pickup longitude.
    pub pickup_longitude: Option<f64>,
    /// Delivery address.
    pub delivery_address: Option<String>,
    /// Delivery latitude.
    pub delivery_latitude: Option<f64>,
    /// Delivery longitude.
    pub delivery_longitude: Option<f64>,
    /// Line items.
    pub items: Option<Vec<CustomItemRequest>>,
    /// Client-computed total, cross-checked only.
    pub total: Option<Decimal>,
    /// Delivery fee.
    pub delivery_fee: Option<Decimal>,
    /// Payment method label.
    pub payment_method: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Customer notes.
    pub notes: Option<String>,
    /// Caller-supplied distance, stored as is.
    pub distance: Option<f64>,
}

/// A line item of a water-tank delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaterTankItemRequest {
    /// Tank or bottle description.
    pub custom_name: Option<String>,
    /// Quantity, at least 1.
    pub quantity: Option<i64>,
    /// Unit price, required.
    pub price: Option<Decimal>,
    /// Handling notes.
    pub special_instructions: Option<String>,
}

/// Request for a water-tank delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaterTankRequest {
    /// Delivery address.
    pub delivery_address: Option<String>,
    /// Delivery latitude, required.
    pub delivery_latitude: Option<f64>,
    /// Delivery longitude, required.
    pub delivery_longitude: Option<f64>,
    /// Water station address.
    pub water_station_address: Option<String>,
    /// Water station latitude.
    pub water_station_latitude: Option<f64>,
    /// Water station longitude.
    pub water_station_longitude: Option<f64>,
    /// Line items.
    pub items: Option<Vec<WaterTankItemRequest>>,
    /// Client-computed subtotal, cross-checked only.
    pub subtotal: Option<Decimal>,
    /// Client-computed total, cross-checked only.
    pub total: Option<Decimal>,
    /// Delivery fee.
    pub delivery_fee: Option<Decimal>,
    /// `cash_on_delivery` or `online`.
    pub payment_method: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Customer notes.
    pub notes: Option<String>,
    /// Caller-supplied distance, stored as is.
    pub distance: Option<f64>,
}

/// A line item after validation. Catalog items are not priced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    /// Item kind marker.
    pub kind: ItemKind,
    /// Catalog product.
    pub product_id: Option<ProductId>,
    /// Free-form name.
    pub custom_name: Option<String>,
    /// Quantity.
    pub quantity: u32,
    /// Unit price, `None` until resolved from the catalog.
    pub price: Option<Decimal>,
    /// Handling notes.
    pub special_instructions: Option<String>,
}

/// A validated order in the common shape, before pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    /// Order classification.
    pub order_type: OrderType,
    /// Source store.
    pub store_id: Option<StoreId>,
    /// Delivery address.
    pub address: String,
    /// Delivery coordinates.
    pub destination: Option<GeoPoint>,
    /// Pickup address.
    pub pickup_address: Option<String>,
    /// Pickup coordinates.
    pub pickup: Option<GeoPoint>,
    /// Delivery fee.
    pub delivery_fee: Decimal,
    /// Subtotal the client claimed.
    pub claimed_subtotal: Option<Decimal>,
    /// Total the client claimed.
    pub claimed_total: Option<Decimal>,
    /// Payment method label.
    pub payment_method: String,
    /// Contact phone.
    pub phone: String,
    /// Customer notes.
    pub notes: Option<String>,
    /// Caller-supplied distance.
    pub distance_km: Option<f64>,
    /// Items.
    pub items: Vec<DraftItem>,
}

impl OrderDraft {
    /// Catalog products referenced by the draft.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().filter_map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Resolve prices and totals into an insertable order.
    ///
    /// `prices` holds the catalog price of every known product.
    ///
    /// # Errors
    ///
    /// Returns a field error for every item whose product is unknown, and for
    /// the first item or total that takes the amounts past [`MAX_AMOUNT`].
    pub fn into_new_order(
        self,
        customer_id: UserId,
        prices: &HashMap<ProductId, Decimal>,
        distance_km: Option<f64>,
        created_at: DateTime<Utc>,
    ) -> Result<NewOrder, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut items = Vec::with_capacity(self.items.len());
        let mut subtotal = Decimal::ZERO;

        for (index, item) in self.items.into_iter().enumerate() {
            let price = match (item.price, item.product_id) {
                (_, Some(product)) => prices.get(&product).copied(),
                (price, None) => price,
            };
            let Some(price) = price else {
                errors.add(
                    format!("items.{index}.product_id"),
                    format!("The selected items.{index}.product_id is invalid."),
                );
                continue;
            };
            let Some(sum) = price
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| subtotal.checked_add(line))
                .filter(|sum| *sum <= MAX_AMOUNT)
            else {
                errors.add(format!("items.{index}.price"), "The amount is too large.");
                break;
            };
            subtotal = sum;
            items.push(NewOrderItem {
                kind: item.kind,
                product_id: item.product_id,
                custom_name: item.custom_name,
                quantity: item.quantity,
                price,
                special_instructions: item.special_instructions,
            });
        }
        errors.into_result()?;

        let Some(total) = subtotal
            .checked_add(self.delivery_fee)
            .filter(|total| *total <= MAX_AMOUNT)
        else {
            return Err(ValidationErrors::single("total", "The amount is too large."));
        };

        if self.claimed_subtotal.is_some_and(|claimed| claimed != subtotal)
            || self.claimed_total.is_some_and(|claimed| claimed != total)
        {
            tracing::warn!(
                order_type = %self.order_type,
                claimed_subtotal = ?self.claimed_subtotal,
                claimed_total = ?self.claimed_total,
                computed_subtotal = %subtotal,
                computed_total = %total,
                "Client totals differ from computed totals, using computed values"
            );
        }

        Ok(NewOrder {
            customer_id,
            store_id: self.store_id,
            order_type: self.order_type,
            address: self.address,
            destination: self.destination,
            pickup_address: self.pickup_address,
            pickup: self.pickup,
            subtotal,
            delivery_fee: self.delivery_fee,
            total,
            payment_method: self.payment_method,
            phone: self.phone,
            notes: self.notes,
            distance_km: distance_km.or(self.distance_km),
            created_at,
            items,
        })
    }
}

/// Type-specific validation and normalization of a creation request.
pub trait CreationPolicy {
    /// The order type this policy produces.
    fn order_type(&self) -> OrderType;

    /// Validate the request and normalize it into a draft.
    ///
    /// # Errors
    ///
    /// Returns every field error found; nothing is written.
    fn into_draft(self) -> Result<OrderDraft, ValidationErrors>;
}

impl CreationPolicy for StoreOrderRequest {
    fn order_type(&self) -> OrderType {
        OrderType::Regular
    }

    fn into_draft(self) -> Result<OrderDraft, ValidationErrors> {
        let mut check = FieldChecker::default();

        let store_id = check.required("store_id", self.store_id).map(StoreId::new);
        let address = check.required_text("address", self.address, None);
        let destination = check.required_point(
            ("latitude", self.latitude),
            ("longitude", self.longitude),
        );
        let delivery_fee = check.money("delivery_fee", self.delivery_fee);
        let claimed_subtotal = check.optional_money("subtotal", self.subtotal);
        let claimed_total = check.optional_money("total", self.total);
        let payment_method = check.required_text("payment_method", self.payment_method, None);
        let phone = check.required_text("phone", self.phone, None);
        let notes = check.optional_text("notes", self.notes, MAX_NOTES_LEN);
        check.optional_distance("distance", self.distance);

        let items = check
            .items("items", self.items)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| check.store_item(index, item))
            .collect();

        check.finish()?;
        Ok(OrderDraft {
            order_type: OrderType::Regular,
            store_id,
            address,
            destination,
            pickup_address: None,
            pickup: None,
            delivery_fee,
            claimed_subtotal,
            claimed_total,
            payment_method,
            phone,
            notes,
            distance_km: None,
            items,
        })
    }
}

impl CreationPolicy for CustomDeliveryRequest {
    fn order_type(&self) -> OrderType {
        OrderType::CustomDelivery
    }

    fn into_draft(self) -> Result<OrderDraft, ValidationErrors> {
        let mut check = FieldChecker::default();

        let pickup_address =
            check.required_text("pickup_address", self.pickup_address, Some(MAX_ADDRESS_LEN));
        let pickup = check.optional_point(
            ("pickup_latitude", self.pickup_latitude),
            ("pickup_longitude", self.pickup_longitude),
        );
        let address =
            check.required_text("delivery_address", self.delivery_address, Some(MAX_ADDRESS_LEN));
        let destination = check.optional_point(
            ("delivery_latitude", self.delivery_latitude),
            ("delivery_longitude", self.delivery_longitude),
        );
        let delivery_fee = check.money("delivery_fee", self.delivery_fee);
        let claimed_total = check.optional_money("total", self.total);
        let payment_method = check.required_text("payment_method", self.payment_method, None);
        let phone = check.required_text("phone", self.phone, Some(MAX_PHONE_LEN));
        let notes = check.optional_text("notes", self.notes, MAX_NOTES_LEN);
        let distance_km = check.optional_distance("distance", self.distance);

        let items = check
            .items("items", self.items)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let prefix = format!("items.{index}");
                let name = check.required_text(
                    &format!("{prefix}.description"),
                    item.description,
                    Some(MAX_DESCRIPTION_LEN),
                );
                let quantity = check.quantity(&format!("{prefix}.quantity"), item.quantity);
                let price = check
                    .optional_money(&format!("{prefix}.price"), item.price)
                    .unwrap_or(Decimal::ZERO);
                let special_instructions = check.optional_text(
                    &format!("{prefix}.special_instructions"),
                    item.special_instructions,
                    MAX_INSTRUCTIONS_LEN,
                );
                quantity.map(|quantity| DraftItem {
                    kind: ItemKind::Custom,
                    product_id: None,
                    custom_name: Some(name),
                    quantity,
                    price: Some(price),
                    special_instructions,
                })
            })
            .collect();

        check.finish()?;
        Ok(OrderDraft {
            order_type: OrderType::CustomDelivery,
            store_id: None,
            address,
            destination,
            pickup_address: Some(pickup_address),
            pickup,
            delivery_fee,
            claimed_subtotal: None,
            claimed_total,
            payment_method,
            phone,
            notes,
            distance_km,
            items,
        })
    }
}

impl CreationPolicy for WaterTankRequest {
    fn order_type(&self) -> OrderType {
        OrderType::WaterTank
    }

    fn into_draft(self) -> Result<OrderDraft, ValidationErrors> {
        let mut check = FieldChecker::default();

        let address =
            check.required_text("delivery_address", self.delivery_address, Some(MAX_ADDRESS_LEN));
        let destination = check.required_point(
            ("delivery_latitude", self.delivery_latitude),
            ("delivery_longitude", self.delivery_longitude),
        );
        let pickup_address = check.required_text(
            "water_station_address",
            self.water_station_address,
            Some(MAX_ADDRESS_LEN),
        );
        let pickup = check.optional_point(
            ("water_station_latitude", self.water_station_latitude),
            ("water_station_longitude", self.water_station_longitude),
        );
        let delivery_fee = check.money("delivery_fee", self.delivery_fee);
        let claimed_subtotal = check.optional_money("subtotal", self.subtotal);
        let claimed_total = check.optional_money("total", self.total);
        let payment_method = check.required_text("payment_method", self.payment_method, None);
        if !payment_method.is_empty() && !WATER_TANK_PAYMENT_METHODS.contains(&payment_method.as_str()) {
            check.errors.add("payment_method", "The selected payment_method is invalid.");
        }
        let phone = check.required_text("phone", self.phone, Some(MAX_PHONE_LEN));
        let notes = check.optional_text("notes", self.notes, MAX_NOTES_LEN);
        let distance_km = check.optional_distance("distance", self.distance);

        let items = check
            .items("items", self.items)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let prefix = format!("items.{index}");
                let name = check.required_text(
                    &format!("{prefix}.custom_name"),
                    item.custom_name,
                    Some(MAX_NAME_LEN),
                );
                let quantity = check.quantity(&format!("{prefix}.quantity"), item.quantity);
                let price = check.money(&format!("{prefix}.price"), item.price);
                let special_instructions = check.optional_text(
                    &format!("{prefix}.special_instructions"),
                    item.special_instructions,
                    MAX_INSTRUCTIONS_LEN,
                );
                quantity.map(|quantity| DraftItem {
                    kind: ItemKind::WaterTank,
                    product_id: None,
                    custom_name: Some(name),
                    quantity,
                    price: Some(price),
                    special_instructions,
                })
            })
            .collect();

        check.finish()?;
        Ok(OrderDraft {
            order_type: OrderType::WaterTank,
            store_id: None,
            address,
            destination,
            pickup_address: Some(pickup_address),
            pickup,
            delivery_fee,
            claimed_subtotal,
            claimed_total,
            payment_method,
            phone,
            notes,
            distance_km,
            items,
        })
    }
}

/// A creation request of any type.
#[derive(Debug, Clone)]
pub enum CreateOrder {
    /// Store order.
    Store(StoreOrderRequest),
    /// Custom delivery.
    CustomDelivery(CustomDeliveryRequest),
    /// Water-tank delivery.
    WaterTank(WaterTankRequest),
}

impl CreationPolicy for CreateOrder {
    fn order_type(&self) -> OrderType {
        match self {
            Self::Store(r) => r.order_type(),
            Self::CustomDelivery(r) => r.order_type(),
            Self::WaterTank(r) => r.order_type(),
        }
    }

    fn into_draft(self) -> Result<OrderDraft, ValidationErrors> {
        match self {
            Self::Store(r) => r.into_draft(),
            Self::CustomDelivery(r) => r.into_draft(),
            Self::WaterTank(r) => r.into_draft(),
        }
    }
}

/// Accumulates field errors while extracting values.
///
/// Extractors return a placeholder on failure so that every field is checked
/// in one pass; the placeholder never escapes because [`FieldChecker::finish`]
/// fails whenever an error was recorded.
#[derive(Debug, Default)]
pub(crate) struct FieldChecker {
    pub(crate) errors: ValidationErrors,
}

impl FieldChecker {
    pub(crate) fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }

    fn missing(&mut self, field: &str) {
        self.errors.add(field, format!("The {field} field is required."));
    }

    pub(crate) fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing(field);
        }
        value
    }

    pub(crate) fn required_text(
        &mut self,
        field: &str,
        value: Option<String>,
        max: Option<usize>,
    ) -> String {
        match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(text) => {
                self.max_len(field, &text, max);
                text
            }
            None => {
                self.missing(field);
                String::new()
            }
        }
    }

    pub(crate) fn optional_text(
        &mut self,
        field: &str,
        value: Option<String>,
        max: usize,
    ) -> Option<String> {
        let text = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
        self.max_len(field, &text, Some(max));
        Some(text)
    }

    fn max_len(&mut self, field: &str, text: &str, max: Option<usize>) {
        if let Some(max) = max {
            if text.chars().count() > max {
                self.errors.add(
                    field,
                    format!("The {field} may not be greater than {max} characters."),
                );
            }
        }
    }

    pub(crate) fn money(&mut self, field: &str, value: Option<Decimal>) -> Decimal {
        match value {
            Some(amount) => self.non_negative(field, amount),
            None => {
                self.missing(field);
                Decimal::ZERO
            }
        }
    }

    pub(crate) fn optional_money(&mut self, field: &str, value: Option<Decimal>) -> Option<Decimal> {
        value.map(|amount| self.non_negative(field, amount))
    }

    fn non_negative(&mut self, field: &str, amount: Decimal) -> Decimal {
        if amount.is_sign_negative() && !amount.is_zero() {
            self.errors.add(field, format!("The {field} must be at least 0."));
        } else if amount > MAX_AMOUNT {
            self.errors.add(
                field,
                format!("The {field} may not be greater than {MAX_AMOUNT}."),
            );
        }
        amount
    }

    pub(crate) fn quantity(&mut self, field: &str, value: Option<i64>) -> Option<u32> {
        let quantity = self.required(field, value)?;
        match u32::try_from(quantity) {
            Ok(q @ 1..=MAX_QUANTITY) => Some(q),
            _ if quantity > 0 => {
                self.errors.add(
                    field,
                    format!("The {field} may not be greater than {MAX_QUANTITY}."),
                );
                None
            }
            _ => {
                self.errors.add(field, format!("The {field} must be at least 1."));
                None
            }
        }
    }

    pub(crate) fn rating(&mut self, field: &str, value: Option<i64>) -> u8 {
        let Some(score) = self.required(field, value) else {
            return 0;
        };
        match u8::try_from(score) {
            Ok(score @ 1..=5) => score,
            _ => {
                self.errors.add(field, format!("The {field} must be between 1 and 5."));
                0
            }
        }
    }

    pub(crate) fn optional_distance(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let distance = value?;
        if !distance.is_finite() || distance < 0.0 {
            self.errors.add(field, format!("The {field} must be at least 0."));
        }
        Some(distance)
    }

    pub(crate) fn required_point(
        &mut self,
        (lat_field, lat): (&str, Option<f64>),
        (lng_field, lng): (&str, Option<f64>),
    ) -> Option<GeoPoint> {
        let lat = self.required(lat_field, lat);
        let lng = self.required(lng_field, lng);
        self.point((lat_field, lat?), (lng_field, lng?))
    }

    pub(crate) fn optional_point(
        &mut self,
        (lat_field, lat): (&str, Option<f64>),
        (lng_field, lng): (&str, Option<f64>),
    ) -> Option<GeoPoint> {
        match (lat, lng) {
            (None, None) => None,
            (Some(lat), Some(lng)) => self.point((lat_field, lat), (lng_field, lng)),
            (None, Some(_)) => {
                self.errors.add(
                    lat_field,
                    format!("The {lat_field} field is required when {lng_field} is present."),
                );
                None
            }
            (Some(_), None) => {
                self.errors.add(
                    lng_field,
                    format!("The {lng_field} field is required when {lat_field} is present."),
                );
                None
            }
        }
    }

    pub(crate) fn point(
        &mut self,
        (lat_field, lat): (&str, f64),
        (lng_field, lng): (&str, f64),
    ) -> Option<GeoPoint> {
        let mut valid = true;
        if !geo::is_valid_latitude(lat) {
            self.errors.add(lat_field, format!("The {lat_field} must be between -90 and 90."));
            valid = false;
        }
        if !geo::is_valid_longitude(lng) {
            self.errors.add(lng_field, format!("The {lng_field} must be between -180 and 180."));
            valid = false;
        }
        valid.then_some(GeoPoint::new(lat, lng))
    }

    /// A standalone coordinate pair: the point, or the errors naming each
    /// coordinate out of range.
    pub(crate) fn position(
        latitude: (&str, f64),
        longitude: (&str, f64),
    ) -> Result<GeoPoint, ValidationErrors> {
        let mut check = Self::default();
        check.point(latitude, longitude).ok_or(check.errors)
    }

    pub(crate) fn items<T>(&mut self, field: &str, value: Option<Vec<T>>) -> Vec<T> {
        match value {
            Some(items) if !items.is_empty() => items,
            Some(_) => {
                self.errors.add(field, format!("The {field} must have at least 1 items."));
                Vec::new()
            }
            None => {
                self.missing(field);
                Vec::new()
            }
        }
    }

    fn store_item(&mut self, index: usize, item: StoreItemRequest) -> Option<DraftItem> {
        let prefix = format!("items.{index}");
        let quantity = self.quantity(&format!("{prefix}.quantity"), item.quantity);
        let special_instructions = self.optional_text(
            &format!("{prefix}.special_instructions"),
            item.special_instructions,
            MAX_INSTRUCTIONS_LEN,
        );
        let custom_name = item
            .custom_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        match (item.product_id, custom_name) {
            (Some(_), Some(_)) => {
                self.errors.add(
                    format!("{prefix}.product_id"),
                    "Provide either a product_id or a custom_name, not both.",
                );
                None
            }
            (None, None) => {
                self.errors.add(
                    format!("{prefix}.product_id"),
                    format!("The {prefix}.product_id field is required when {prefix}.custom_name is not present."),
                );
                None
            }
            (Some(product), None) => {
                // catalog price wins; a client price is only range-checked
                self.optional_money(&format!("{prefix}.price"), item.price);
                quantity.map(|quantity| DraftItem {
                    kind: ItemKind::Product,
                    product_id: Some(ProductId::new(product)),
                    custom_name: None,
                    quantity,
                    price: None,
                    special_instructions,
                })
            }
            (None, Some(name)) => {
                self.max_len(&format!("{prefix}.custom_name"), &name, Some(MAX_NAME_LEN));
                let price = self.money(&format!("{prefix}.price"), item.price);
                quantity.map(|quantity| DraftItem {
                    kind: ItemKind::Custom,
                    product_id: None,
                    custom_name: Some(name),
                    quantity,
                    price: Some(price),
                    special_instructions,
                })
            }
        }
    }
}
