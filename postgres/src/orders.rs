//! `PostgreSQL` order storage.

use crate::rows::{self, ITEM_COLUMNS, ORDER_COLUMNS, RATING_COLUMNS, db};
use courier_core::StoreError;
use courier_core::lifecycle::OrderStatus;
use courier_core::order::{ItemId, Order, OrderId, OrderItem, Rating};
use courier_core::store::{
    EmployerMatch, ItemUpdate, NewOrder, NewRating, OrderChange, OrderFilter, OrderGuard,
    OrderStore, StoreFuture,
};
use sqlx::postgres::{PgConnection, PgPool, Postgres};
use sqlx::{QueryBuilder, Row};
use std::collections::HashMap;

/// Orders, line items and ratings stored in `PostgreSQL`.
///
/// Inserts and rating writes run in a transaction. Guarded updates are a
/// single conditional `UPDATE`, so the guard is evaluated under the row lock.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let (latitude, longitude) = rows::split_point(order.destination);
        let (pickup_latitude, pickup_longitude) = rows::split_point(order.pickup);

        let (id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO orders (
                user_id, store_id, order_type, status, address, latitude, longitude,
                pickup_address, pickup_latitude, pickup_longitude,
                subtotal, delivery_fee, total, payment_method, phone, notes, distance_km,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18)
            RETURNING id
            ",
        )
        .bind(order.customer_id.get())
        .bind(order.store_id.map(|store| store.get()))
        .bind(order.order_type.as_str())
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.address)
        .bind(latitude)
        .bind(longitude)
        .bind(&order.pickup_address)
        .bind(pickup_latitude)
        .bind(pickup_longitude)
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.total)
        .bind(&order.payment_method)
        .bind(&order.phone)
        .bind(&order.notes)
        .bind(order.distance_km)
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;

        for item in &order.items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| StoreError::Database(format!("quantity too large: {}", item.quantity)))?;
            sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, type, product_id, custom_name, quantity, price, special_instructions)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(id)
            .bind(item.kind.as_str())
            .bind(item.product_id.map(|product| product.get()))
            .bind(&item.custom_name)
            .bind(quantity)
            .bind(item.price)
            .bind(&item.special_instructions)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        let created = load_order(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::Database(format!("order {id} missing after insert")))?;
        tx.commit().await.map_err(db)?;

        tracing::debug!(order_id = id, items = created.items.len(), "Order inserted");
        Ok(created)
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"
        ));
        if let Some(customer) = filter.customer_id {
            query.push(" AND user_id = ").push_bind(customer.get());
        }
        push_employer(&mut query, filter.employer);
        if !filter.statuses.is_empty() {
            query
                .push(" AND status = ANY(")
                .push_bind(status_names(&filter.statuses))
                .push(")");
        }
        if let Some(order_type) = filter.order_type {
            query.push(" AND order_type = ").push_bind(order_type.as_str());
        }
        if let Some(from) = filter.created_from {
            query.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(before) = filter.created_before {
            query.push(" AND created_at < ").push_bind(before);
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let mut conn = self.pool.acquire().await.map_err(db)?;
        let records = query.build().fetch_all(&mut *conn).await.map_err(db)?;
        let ids = records
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(db)?;
        let mut items = load_items(&mut conn, &ids).await?;

        records
            .iter()
            .zip(ids)
            .map(|(row, id)| rows::order_from_row(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn update(
        &self,
        id: OrderId,
        guard: OrderGuard,
        change: OrderChange,
    ) -> Result<Option<Order>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE orders SET updated_at = ");
        query.push_bind(change.at);
        if let Some(status) = change.status {
            query.push(", status = ").push_bind(status.as_str());
        }
        if let Some(driver) = change.employer_id {
            query.push(", employer_id = ").push_bind(driver.get());
        }
        for milestone in change.milestones() {
            let column = milestone.column();
            query
                .push(format!(", {column} = COALESCE({column}, "))
                .push_bind(change.at)
                .push(")");
        }
        if let Some(position) = change.location {
            query
                .push(", current_latitude = ")
                .push_bind(position.latitude)
                .push(", current_longitude = ")
                .push_bind(position.longitude)
                .push(", location_updated_at = ")
                .push_bind(change.at);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id.get())
            .push(" AND status = ANY(")
            .push_bind(status_names(&guard.statuses))
            .push(")");
        push_employer(&mut query, guard.employer);
        if let Some(customer) = guard.customer {
            query.push(" AND user_id = ").push_bind(customer.get());
        }
        query.push(" RETURNING id");

        let mut tx = self.pool.begin().await.map_err(db)?;
        if query.build().fetch_optional(&mut *tx).await.map_err(db)?.is_none() {
            metrics::counter!("courier.store.guard_misses").increment(1);
            return Ok(None);
        }
        let updated = load_order(&mut tx, id.get()).await?;
        tx.commit().await.map_err(db)?;
        Ok(updated)
    }

    async fn rate(&self, rating: NewRating) -> Result<Option<Rating>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let row = sqlx::query(&format!(
            r"
            INSERT INTO ratings (order_id, user_id, store_id, rating, review, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING {RATING_COLUMNS}
            "
        ))
        .bind(rating.order_id.get())
        .bind(rating.customer_id.get())
        .bind(rating.store_id.get())
        .bind(i16::from(rating.rating))
        .bind(&rating.review)
        .bind(rating.created_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let stored = rows::rating_from_row(&row)?;

        sqlx::query("UPDATE orders SET rating = $2, review = $3 WHERE id = $1")
            .bind(rating.order_id.get())
            .bind(i16::from(stored.rating))
            .bind(&stored.review)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        tx.commit().await.map_err(db)?;

        Ok(Some(stored))
    }

    async fn change_item(
        &self,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<Option<OrderItem>, StoreError> {
        let quantity = update
            .quantity
            .map(i32::try_from)
            .transpose()
            .map_err(|_| StoreError::Database("quantity too large".to_string()))?;

        let row = sqlx::query(&format!(
            r"
            UPDATE order_items
            SET quantity = COALESCE($2, quantity),
                price = COALESCE($3, price),
                special_instructions = COALESCE($4, special_instructions)
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(id.get())
        .bind(quantity)
        .bind(update.price)
        .bind(update.special_instructions)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(rows::item_from_row).transpose()
    }
}

fn status_names(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn push_employer(query: &mut QueryBuilder<'_, Postgres>, employer: EmployerMatch) {
    match employer {
        EmployerMatch::Any => {}
        EmployerMatch::Is(driver) => {
            query.push(" AND employer_id = ").push_bind(driver.get());
        }
        EmployerMatch::UnassignedOr(driver) => {
            query
                .push(" AND (employer_id IS NULL OR employer_id = ")
                .push_bind(driver.get())
                .push(")");
        }
    }
}

async fn load_items(
    conn: &mut PgConnection,
    order_ids: &[i64],
) -> Result<HashMap<i64, Vec<OrderItem>>, StoreError> {
    let records = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
    ))
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db)?;

    let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for row in &records {
        let item = rows::item_from_row(row)?;
        grouped.entry(item.order_id.get()).or_default().push(item);
    }
    Ok(grouped)
}

async fn load_order(conn: &mut PgConnection, id: i64) -> Result<Option<Order>, StoreError> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db)?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut items = load_items(conn, &[id]).await?;
    rows::order_from_row(&row, items.remove(&id).unwrap_or_default()).map(Some)
}

impl OrderStore for PostgresOrderStore {
    fn insert_order(&self, order: NewOrder) -> StoreFuture<'_, Order> {
        Box::pin(self.insert(order))
    }

    fn find_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(db)?;
            load_order(&mut conn, id.get()).await
        })
    }

    fn list_orders(&self, filter: OrderFilter) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(self.list(filter))
    }

    fn update_order(
        &self,
        id: OrderId,
        guard: OrderGuard,
        change: OrderChange,
    ) -> StoreFuture<'_, Option<Order>> {
        Box::pin(self.update(id, guard, change))
    }

    fn delete_order(&self, id: OrderId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM orders WHERE id = $1")
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(db)?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn insert_rating(&self, rating: NewRating) -> StoreFuture<'_, Option<Rating>> {
        Box::pin(self.rate(rating))
    }

    fn find_item(&self, id: ItemId) -> StoreFuture<'_, Option<OrderItem>> {
        Box::pin(async move {
            let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(db)?;
            row.as_ref().map(rows::item_from_row).transpose()
        })
    }

    fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreFuture<'_, Option<OrderItem>> {
        Box::pin(self.change_item(id, update))
    }

    fn delete_item(&self, id: ItemId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(db)?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(db)?;
            Ok(())
        })
    }
}
