use std::sync::Arc;
use tracing::instrument;

use crate::models::{AnalyticsQuery, AnalyticsSummary, CurrentUser, Role, ServiceError, ServiceResult};
use crate::observability::DatabaseTracingMiddleware;
use crate::repositories::{AnalyticsRepository, RestaurantRepository};

/// Back-office dashboard figures, aggregated in SQL
pub struct AnalyticsService {
    analytics: Arc<dyn AnalyticsRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    db_tracing: DatabaseTracingMiddleware,
}

impl AnalyticsService {
    pub fn new(
        analytics: Arc<dyn AnalyticsRepository>,
        restaurants: Arc<dyn RestaurantRepository>,
        db_tracing: DatabaseTracingMiddleware,
    ) -> Self {
        Self {
            analytics,
            restaurants,
            db_tracing,
        }
    }

    /// Admins may query the whole chain; staff must pick a single restaurant
    #[instrument(skip(self), fields(user_id = current.id, role = %current.role))]
    pub async fn summary(
        &self,
        current: &CurrentUser,
        query: AnalyticsQuery,
    ) -> ServiceResult<AnalyticsSummary> {
        match current.role {
            Role::Admin => {}
            Role::Staff if query.restaurant_id.is_some() => {}
            Role::Staff => {
                return Err(ServiceError::forbidden(
                    "Staff analytics must be scoped to a restaurant",
                ))
            }
            _ => return Err(ServiceError::forbidden("Analytics require staff or admin")),
        }

        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ServiceError::ValidationError {
                    message: "'from' must not be after 'to'".to_string(),
                });
            }
        }

        if let Some(restaurant_id) = query.restaurant_id {
            self.restaurants
                .find_by_id(restaurant_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Restaurant", restaurant_id))?;
        }

        let summary = self
            .db_tracing
            .trace_operation("aggregate", "orders", self.analytics.summary(query))
            .await?;

        crate::info_with_trace!(
            total_orders = summary.total_orders,
            delivered_revenue = %summary.delivered_revenue,
            "Analytics summary computed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RepositoryError, TopMenuItem};
    use crate::observability::Metrics;
    use crate::services::restaurant_service::tests::{restaurant, MockTestRestaurantRepository};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use mockall::mock;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    mock! {
        TestAnalyticsRepository {}

        #[async_trait]
        impl AnalyticsRepository for TestAnalyticsRepository {
            async fn orders_by_status(&self, query: &AnalyticsQuery) -> Result<BTreeMap<String, i64>, RepositoryError>;
            async fn delivered_totals(&self, query: &AnalyticsQuery) -> Result<(i64, i64), RepositoryError>;
            async fn top_items(&self, query: &AnalyticsQuery) -> Result<Vec<TopMenuItem>, RepositoryError>;
            async fn bookings_by_status(&self, query: &AnalyticsQuery) -> Result<BTreeMap<String, i64>, RepositoryError>;
            async fn average_rating(&self, query: &AnalyticsQuery) -> Result<Option<f64>, RepositoryError>;
        }
    }

    fn actor(role: Role) -> CurrentUser {
        CurrentUser {
            id: 1,
            email: "someone@example.com".to_string(),
            role,
        }
    }

    fn analytics() -> MockTestAnalyticsRepository {
        let mut analytics = MockTestAnalyticsRepository::new();
        analytics.expect_orders_by_status().returning(|_| {
            Ok(BTreeMap::from([
                ("delivered".to_string(), 3),
                ("pending".to_string(), 1),
            ]))
        });
        analytics
            .expect_delivered_totals()
            .returning(|_| Ok((10_000, 3)));
        analytics.expect_top_items().returning(|_| Ok(vec![]));
        analytics
            .expect_bookings_by_status()
            .returning(|_| Ok(BTreeMap::new()));
        analytics.expect_average_rating().returning(|_| Ok(Some(4.0)));
        analytics
    }

    fn service(
        analytics: MockTestAnalyticsRepository,
        restaurants: MockTestRestaurantRepository,
    ) -> (AnalyticsService, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let service = AnalyticsService::new(
            Arc::new(analytics),
            Arc::new(restaurants),
            DatabaseTracingMiddleware::new(metrics.clone()),
        );
        (service, metrics)
    }

    #[tokio::test]
    async fn test_admin_summary() {
        let (service, metrics) = service(analytics(), MockTestRestaurantRepository::new());

        let summary = service
            .summary(&actor(Role::Admin), AnalyticsQuery::default())
            .await
            .unwrap();

        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.delivered_revenue, dec!(100.00));
        assert_eq!(summary.average_order_value, dec!(33.33));
        assert_eq!(summary.average_rating, Some(4.0));

        let exported = metrics.encode().unwrap();
        assert!(exported.contains("database_operations_total"));
    }

    #[tokio::test]
    async fn test_staff_must_scope_to_restaurant() {
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_by_id()
            .returning(|id| Ok(Some(restaurant(id, true))));
        let (service, _) = service(analytics(), restaurants);
        let staff = actor(Role::Staff);

        let unscoped = service.summary(&staff, AnalyticsQuery::default()).await;
        assert!(matches!(unscoped, Err(ServiceError::Forbidden { .. })));

        let scoped = service
            .summary(
                &staff,
                AnalyticsQuery {
                    restaurant_id: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(scoped.restaurant_id, Some(1));
    }

    #[tokio::test]
    async fn test_other_roles_forbidden_and_window_checked() {
        let (service, _) = service(
            MockTestAnalyticsRepository::new(),
            MockTestRestaurantRepository::new(),
        );

        let courier = service
            .summary(&actor(Role::Courier), AnalyticsQuery::default())
            .await;
        assert!(matches!(courier, Err(ServiceError::Forbidden { .. })));

        let now = Utc::now();
        let inverted = service
            .summary(
                &actor(Role::Admin),
                AnalyticsQuery {
                    restaurant_id: None,
                    from: Some(now),
                    to: Some(now - Duration::days(1)),
                },
            )
            .await;
        assert!(matches!(inverted, Err(ServiceError::ValidationError { .. })));
    }
}
