//! Row mapping shared by the stores.

use courier_core::geo::GeoPoint;
use courier_core::lifecycle::OrderStatus;
use courier_core::order::{
    DeliveryTracking, ItemId, ItemKind, Milestones, Order, OrderId, OrderItem, OrderType,
    ProductId, Rating, StoreId, UserId,
};
use courier_core::StoreError;
use sqlx::postgres::PgRow;
use sqlx::Row;

pub(crate) const ORDER_COLUMNS: &str = "id, user_id, employer_id, store_id, order_type, status, \
     address, latitude, longitude, pickup_address, pickup_latitude, pickup_longitude, \
     subtotal, delivery_fee, total, payment_method, phone, notes, distance_km, \
     assigned_at, confirmed_at, preparing_at, on_the_way_at, delivered_at, canceled_at, \
     current_latitude, current_longitude, location_updated_at, rating, review, \
     created_at, updated_at";

pub(crate) const ITEM_COLUMNS: &str =
    "id, order_id, type, product_id, custom_name, quantity, price, special_instructions";

pub(crate) const RATING_COLUMNS: &str =
    "id, order_id, user_id, store_id, rating, review, created_at";

pub(crate) fn db(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
}

pub(crate) fn split_point(point: Option<GeoPoint>) -> (Option<f64>, Option<f64>) {
    point.map_or((None, None), |p| (Some(p.latitude), Some(p.longitude)))
}

fn score(raw: i16) -> Result<u8, StoreError> {
    u8::try_from(raw).map_err(|_| StoreError::Corrupt(format!("rating out of range: {raw}")))
}

/// Map an `orders` row selected with [`ORDER_COLUMNS`].
pub(crate) fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let status: String = row.try_get("status").map_err(db)?;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown order status: {status}")))?;
    let order_type: String = row.try_get("order_type").map_err(db)?;
    let order_type = OrderType::parse(&order_type)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown order type: {order_type}")))?;

    let tracking = point(
        row.try_get("current_latitude").map_err(db)?,
        row.try_get("current_longitude").map_err(db)?,
    )
    .zip(row.try_get("location_updated_at").map_err(db)?)
    .map(|(position, updated_at)| DeliveryTracking {
        position,
        updated_at,
    });

    Ok(Order {
        id: OrderId::new(row.try_get("id").map_err(db)?),
        customer_id: UserId::new(row.try_get("user_id").map_err(db)?),
        employer_id: row
            .try_get::<Option<i64>, _>("employer_id")
            .map_err(db)?
            .map(UserId::new),
        store_id: row
            .try_get::<Option<i64>, _>("store_id")
            .map_err(db)?
            .map(StoreId::new),
        order_type,
        status,
        address: row.try_get("address").map_err(db)?,
        destination: point(
            row.try_get("latitude").map_err(db)?,
            row.try_get("longitude").map_err(db)?,
        ),
        pickup_address: row.try_get("pickup_address").map_err(db)?,
        pickup: point(
            row.try_get("pickup_latitude").map_err(db)?,
            row.try_get("pickup_longitude").map_err(db)?,
        ),
        subtotal: row.try_get("subtotal").map_err(db)?,
        delivery_fee: row.try_get("delivery_fee").map_err(db)?,
        total: row.try_get("total").map_err(db)?,
        payment_method: row.try_get("payment_method").map_err(db)?,
        phone: row.try_get("phone").map_err(db)?,
        notes: row.try_get("notes").map_err(db)?,
        distance_km: row.try_get("distance_km").map_err(db)?,
        milestones: Milestones {
            assigned_at: row.try_get("assigned_at").map_err(db)?,
            confirmed_at: row.try_get("confirmed_at").map_err(db)?,
            preparing_at: row.try_get("preparing_at").map_err(db)?,
            on_the_way_at: row.try_get("on_the_way_at").map_err(db)?,
            delivered_at: row.try_get("delivered_at").map_err(db)?,
            canceled_at: row.try_get("canceled_at").map_err(db)?,
        },
        tracking,
        rating: row
            .try_get::<Option<i16>, _>("rating")
            .map_err(db)?
            .map(score)
            .transpose()?,
        review: row.try_get("review").map_err(db)?,
        created_at: row.try_get("created_at").map_err(db)?,
        updated_at: row.try_get("updated_at").map_err(db)?,
        items,
    })
}

/// Map an `order_items` row selected with [`ITEM_COLUMNS`].
pub(crate) fn item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    let kind: String = row.try_get("type").map_err(db)?;
    let kind = ItemKind::parse(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown item type: {kind}")))?;
    let quantity: i32 = row.try_get("quantity").map_err(db)?;

    Ok(OrderItem {
        id: ItemId::new(row.try_get("id").map_err(db)?),
        order_id: OrderId::new(row.try_get("order_id").map_err(db)?),
        kind,
        product_id: row
            .try_get::<Option<i64>, _>("product_id")
            .map_err(db)?
            .map(ProductId::new),
        custom_name: row.try_get("custom_name").map_err(db)?,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative quantity: {quantity}")))?,
        price: row.try_get("price").map_err(db)?,
        special_instructions: row.try_get("special_instructions").map_err(db)?,
    })
}

/// Map a `ratings` row selected with [`RATING_COLUMNS`].
pub(crate) fn rating_from_row(row: &PgRow) -> Result<Rating, StoreError> {
    Ok(Rating {
        id: row.try_get("id").map_err(db)?,
        order_id: OrderId::new(row.try_get("order_id").map_err(db)?),
        customer_id: UserId::new(row.try_get("user_id").map_err(db)?),
        store_id: StoreId::new(row.try_get("store_id").map_err(db)?),
        rating: score(row.try_get("rating").map_err(db)?)?,
        review: row.try_get("review").map_err(db)?,
        created_at: row.try_get("created_at").map_err(db)?,
    })
}
