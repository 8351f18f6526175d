use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{instrument, Instrument};

use super::database::db_span;
use crate::models::{
    from_cents, AnalyticsQuery, AnalyticsSummary, BookingStatus, OrderStatus, RepositoryResult,
    TopMenuItem, TOP_ITEMS_LIMIT,
};

/// Trait defining the interface for dashboard aggregation
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn orders_by_status(&self, query: &AnalyticsQuery) -> RepositoryResult<BTreeMap<String, i64>>;

    /// Revenue in cents and number of delivered orders
    async fn delivered_totals(&self, query: &AnalyticsQuery) -> RepositoryResult<(i64, i64)>;

    async fn top_items(&self, query: &AnalyticsQuery) -> RepositoryResult<Vec<TopMenuItem>>;

    async fn bookings_by_status(
        &self,
        query: &AnalyticsQuery,
    ) -> RepositoryResult<BTreeMap<String, i64>>;

    async fn average_rating(&self, query: &AnalyticsQuery) -> RepositoryResult<Option<f64>>;

    /// All of the above in one summary
    async fn summary(&self, query: AnalyticsQuery) -> RepositoryResult<AnalyticsSummary> {
        let orders_by_status = self.orders_by_status(&query).await?;
        let (revenue_cents, delivered_count) = self.delivered_totals(&query).await?;
        let top_items = self.top_items(&query).await?;
        let bookings_by_status = self.bookings_by_status(&query).await?;
        let average_rating = self.average_rating(&query).await?;

        let delivered_revenue = from_cents(revenue_cents);
        let average_order_value = if delivered_count > 0 {
            (delivered_revenue / Decimal::from(delivered_count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };

        Ok(AnalyticsSummary {
            restaurant_id: query.restaurant_id,
            from: query.from,
            to: query.to,
            total_orders: orders_by_status.values().sum(),
            orders_by_status,
            delivered_revenue,
            average_order_value,
            top_items,
            bookings_by_status,
            average_rating,
            generated_at: Utc::now(),
        })
    }
}

/// SQLite implementation of the AnalyticsRepository trait
pub struct SqliteAnalyticsRepository {
    pool: SqlitePool,
}

impl SqliteAnalyticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Restaurant and created_at window predicate over the aliased table
fn window_filter(alias: &str) -> String {
    format!(
        "(?1 IS NULL OR {a}.restaurant_id = ?1) \
         AND (?2 IS NULL OR {a}.created_at >= ?2) \
         AND (?3 IS NULL OR {a}.created_at < ?3)",
        a = alias
    )
}

/// Every known status appears in the map, zero when absent
fn zero_filled<'a>(statuses: impl Iterator<Item = &'a str>) -> BTreeMap<String, i64> {
    statuses.map(|s| (s.to_string(), 0)).collect()
}

#[async_trait]
impl AnalyticsRepository for SqliteAnalyticsRepository {
    #[instrument(skip(self))]
    async fn orders_by_status(&self, query: &AnalyticsQuery) -> RepositoryResult<BTreeMap<String, i64>> {
        let rows = sqlx::query(&format!(
            "SELECT o.status AS status, COUNT(*) AS total FROM orders o WHERE {} GROUP BY o.status",
            window_filter("o")
        ))
        .bind(query.restaurant_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "orders"))
        .await?;

        let mut counts = zero_filled(OrderStatus::ALL.iter().map(|s| s.as_str()));
        for row in &rows {
            counts.insert(row.try_get("status")?, row.try_get("total")?);
        }
        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn delivered_totals(&self, query: &AnalyticsQuery) -> RepositoryResult<(i64, i64)> {
        let row = sqlx::query(&format!(
            "SELECT COALESCE(SUM(o.total_cents), 0) AS revenue, COUNT(*) AS delivered \
             FROM orders o WHERE o.status = 'delivered' AND {}",
            window_filter("o")
        ))
        .bind(query.restaurant_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.pool)
        .instrument(db_span("SELECT", "orders"))
        .await?;

        Ok((row.try_get("revenue")?, row.try_get("delivered")?))
    }

    #[instrument(skip(self))]
    async fn top_items(&self, query: &AnalyticsQuery) -> RepositoryResult<Vec<TopMenuItem>> {
        let rows = sqlx::query(&format!(
            "SELECT oi.menu_item_id AS menu_item_id, MAX(oi.name) AS name, \
                    SUM(oi.quantity) AS quantity, \
                    SUM(oi.unit_price_cents * oi.quantity) AS revenue_cents \
             FROM order_items oi JOIN orders o ON o.id = oi.order_id \
             WHERE o.status = 'delivered' AND {} \
             GROUP BY oi.menu_item_id \
             ORDER BY quantity DESC, revenue_cents DESC, oi.menu_item_id \
             LIMIT ?4",
            window_filter("o")
        ))
        .bind(query.restaurant_id)
        .bind(query.from)
        .bind(query.to)
        .bind(TOP_ITEMS_LIMIT)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "order_items"))
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(TopMenuItem {
                menu_item_id: row.try_get("menu_item_id")?,
                name: row.try_get("name")?,
                quantity: row.try_get("quantity")?,
                revenue: from_cents(row.try_get("revenue_cents")?),
            });
        }
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn bookings_by_status(
        &self,
        query: &AnalyticsQuery,
    ) -> RepositoryResult<BTreeMap<String, i64>> {
        let rows = sqlx::query(&format!(
            "SELECT b.status AS status, COUNT(*) AS total FROM bookings b WHERE {} GROUP BY b.status",
            window_filter("b")
        ))
        .bind(query.restaurant_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "bookings"))
        .await?;

        let mut counts = zero_filled(BookingStatus::ALL.iter().map(|s| s.as_str()));
        for row in &rows {
            counts.insert(row.try_get("status")?, row.try_get("total")?);
        }
        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn average_rating(&self, query: &AnalyticsQuery) -> RepositoryResult<Option<f64>> {
        let average: Option<f64> = sqlx::query_scalar(&format!(
            "SELECT AVG(v.rating) FROM reviews v WHERE v.status = 'approved' AND {}",
            window_filter("v")
        ))
        .bind(query.restaurant_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.pool)
        .instrument(db_span("SELECT", "reviews"))
        .await?;

        Ok(average)
    }
}
