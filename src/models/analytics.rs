use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query window for the analytics summary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsQuery {
    pub restaurant_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMenuItem {
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// Aggregated figures for the back-office dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub restaurant_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub total_orders: i64,
    pub orders_by_status: BTreeMap<String, i64>,
    pub delivered_revenue: Decimal,
    pub average_order_value: Decimal,
    pub top_items: Vec<TopMenuItem>,
    pub bookings_by_status: BTreeMap<String, i64>,
    pub average_rating: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

/// Number of best sellers reported
pub const TOP_ITEMS_LIMIT: i64 = 5;
