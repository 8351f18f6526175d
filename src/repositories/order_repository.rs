use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::{info, instrument, Instrument};

use super::database::{db_span, parse_column, returned_row};
use super::StatusUpdate;
use crate::models::{
    from_cents, to_cents, NewOrder, Order, OrderFilters, OrderItem, OrderStatus, RepositoryResult,
};

/// Trait defining the interface for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert the order and all of its lines in one transaction
    async fn create(&self, order: NewOrder) -> RepositoryResult<Order>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>>;

    async fn find_all(&self, filters: OrderFilters) -> RepositoryResult<Vec<Order>>;

    /// Compare-and-set on the current status; `courier_id` replaces the assigned courier
    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        courier_id: Option<i64>,
    ) -> RepositoryResult<StatusUpdate<Order>>;
}

/// SQLite implementation of the OrderRepository trait
pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, order_ids: &[i64]) -> RepositoryResult<HashMap<i64, Vec<OrderItem>>> {
        let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let placeholders = vec!["?"; order_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id IN ({}) ORDER BY id",
            ITEM_COLUMNS, placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in order_ids {
            query = query.bind(*id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", "order_items"))
            .await?;

        for row in &rows {
            let item = row_to_order_item(row)?;
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn with_items(&self, mut orders: Vec<Order>) -> RepositoryResult<Vec<Order>> {
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut items = self.load_items(&ids).await?;
        for order in &mut orders {
            order.items = items.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }
}

const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, courier_id, status, total_cents, \
    delivery_address, contact_phone, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, menu_item_id, name, unit_price_cents, quantity";

fn row_to_order(row: &SqliteRow) -> RepositoryResult<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        courier_id: row.try_get("courier_id")?,
        status: parse_column::<OrderStatus>(row, "status")?,
        total_amount: from_cents(row.try_get("total_cents")?),
        delivery_address: row.try_get("delivery_address")?,
        contact_phone: row.try_get("contact_phone")?,
        notes: row.try_get("notes")?,
        items: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: &SqliteRow) -> RepositoryResult<OrderItem> {
    let unit_price = from_cents(row.try_get("unit_price_cents")?);
    let quantity: u32 = row.try_get("quantity")?;
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        menu_item_id: row.try_get("menu_item_id")?,
        name: row.try_get("name")?,
        unit_price,
        quantity,
        line_total: unit_price * rust_decimal::Decimal::from(quantity),
    })
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    #[instrument(skip(self, order), fields(user_id = order.user_id, lines = order.items.len()))]
    async fn create(&self, order: NewOrder) -> RepositoryResult<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(&format!(
            "INSERT INTO orders (user_id, restaurant_id, courier_id, status, total_cents, \
             delivery_address, contact_phone, notes, created_at, updated_at) \
             VALUES (?, ?, NULL, 'pending', ?, ?, ?, ?, ?, ?) RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order.user_id)
        .bind(order.restaurant_id)
        .bind(to_cents(order.total_amount()))
        .bind(order.delivery_address.trim())
        .bind(order.contact_phone.trim())
        .bind(&order.notes)
        .bind(now)
        .bind(now)
        .fetch_all(&mut *tx)
        .instrument(db_span("INSERT", "orders"))
        .await?;
        let mut created = row_to_order(&returned_row(rows)?)?;

        for line in &order.items {
            let rows = sqlx::query(&format!(
                "INSERT INTO order_items (order_id, menu_item_id, name, unit_price_cents, quantity) \
                 VALUES (?, ?, ?, ?, ?) RETURNING {}",
                ITEM_COLUMNS
            ))
            .bind(created.id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(to_cents(line.unit_price))
            .bind(line.quantity)
            .fetch_all(&mut *tx)
            .instrument(db_span("INSERT", "order_items"))
            .await?;
            created.items.push(row_to_order_item(&returned_row(rows)?)?);
        }

        tx.commit().await?;
        info!(order_id = created.id, total = %created.total_amount, "Order created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "orders"))
            .await?;

        match row {
            Some(row) => {
                let order = row_to_order(&row)?;
                Ok(self.with_items(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_all(&self, filters: OrderFilters) -> RepositoryResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders \
             WHERE (?1 IS NULL OR user_id = ?1) \
               AND (?2 IS NULL OR restaurant_id = ?2) \
               AND (?3 IS NULL OR status = ?3) \
               AND (?4 IS NULL OR courier_id = ?4 \
                    OR (status = 'preparing' AND courier_id IS NULL)) \
             ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        ))
        .bind(filters.user_id)
        .bind(filters.restaurant_id)
        .bind(filters.status.map(|s| s.as_str()))
        .bind(filters.courier_id)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "orders"))
        .await?;

        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>, _>>()?;
        let orders = self.with_items(orders).await?;
        info!("Found {} orders", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        courier_id: Option<i64>,
    ) -> RepositoryResult<StatusUpdate<Order>> {
        let rows = sqlx::query(&format!(
            "UPDATE orders SET status = ?, courier_id = ?, updated_at = ? \
             WHERE id = ? AND status = ? RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(next.as_str())
        .bind(courier_id)
        .bind(Utc::now())
        .bind(id)
        .bind(expected.as_str())
        .fetch_all(&self.pool)
        .instrument(db_span("UPDATE", "orders"))
        .await?;

        match rows.into_iter().next() {
            Some(row) => {
                let order = row_to_order(&row)?;
                info!(order_id = id, from = %expected, to = %next, "Order status updated");
                let mut orders = self.with_items(vec![order]).await?;
                match orders.pop() {
                    Some(order) => Ok(StatusUpdate::Updated(order)),
                    None => Ok(StatusUpdate::Stale),
                }
            }
            None => Ok(StatusUpdate::Stale),
        }
    }
}
