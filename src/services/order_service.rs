use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::restaurant_service::active_restaurant;
use crate::models::{
    merge_order_lines, CreateOrderRequest, CurrentUser, MenuItem, NewOrder, NewOrderItem, Order,
    OrderFilters, OrderStatus, Role, ServiceError, ServiceResult, Validate, MAX_ORDER_QUANTITY,
};
use crate::observability::{BusinessDomain, BusinessTracingMiddleware};
use crate::repositories::{MenuRepository, OrderRepository, RestaurantRepository, StatusUpdate};

/// Order placement and the delivery lifecycle
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    menu: Arc<dyn MenuRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    tracing: BusinessTracingMiddleware,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        menu: Arc<dyn MenuRepository>,
        restaurants: Arc<dyn RestaurantRepository>,
        tracing: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            orders,
            menu,
            restaurants,
            tracing,
        }
    }

    /// Price the order from the menu and persist it with its lines
    #[instrument(skip(self, request), fields(user_id = current.id, restaurant_id = request.restaurant_id))]
    pub async fn create_order(
        &self,
        current: &CurrentUser,
        request: CreateOrderRequest,
    ) -> ServiceResult<Order> {
        self.tracing
            .trace(
                BusinessDomain::Order,
                "create",
                self.place_order(current, request),
            )
            .await
    }

    #[instrument(skip(self), fields(user_id = current.id, role = %current.role))]
    pub async fn list_orders(
        &self,
        current: &CurrentUser,
        mut filters: OrderFilters,
    ) -> ServiceResult<Vec<Order>> {
        match current.role {
            Role::Admin | Role::Staff => {}
            Role::Courier => {
                filters.user_id = None;
                filters.courier_id = Some(current.id);
            }
            Role::User => {
                filters.user_id = Some(current.id);
                filters.courier_id = None;
            }
            Role::Moderator => {
                return Err(ServiceError::forbidden("Moderators cannot view orders"));
            }
        }

        let orders = self.orders.find_all(filters).await?;
        info!(count = orders.len(), "Listed orders");
        Ok(orders)
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn get_order(&self, current: &CurrentUser, id: i64) -> ServiceResult<Order> {
        let order = self.find(id).await?;

        if !order.can_be_viewed_by(current) {
            return Err(ServiceError::forbidden("Not allowed to view this order"));
        }
        Ok(order)
    }

    #[instrument(skip(self), fields(user_id = current.id, role = %current.role))]
    pub async fn update_status(
        &self,
        current: &CurrentUser,
        id: i64,
        next: OrderStatus,
    ) -> ServiceResult<Order> {
        self.tracing
            .trace(
                BusinessDomain::Order,
                "update_status",
                self.transition(current, id, next),
            )
            .await
    }

    async fn place_order(
        &self,
        current: &CurrentUser,
        request: CreateOrderRequest,
    ) -> ServiceResult<Order> {
        request.validate()?;

        let lines = merge_order_lines(&request.items);
        if let Some(line) = lines.iter().find(|l| l.quantity > MAX_ORDER_QUANTITY) {
            return Err(ServiceError::ValidationError {
                message: format!(
                    "Quantity for menu item {} exceeds {}",
                    line.menu_item_id, MAX_ORDER_QUANTITY
                ),
            });
        }

        active_restaurant(self.restaurants.as_ref(), request.restaurant_id).await?;

        let ids: Vec<i64> = lines.iter().map(|l| l.menu_item_id).collect();
        let menu_items: HashMap<i64, MenuItem> = self
            .menu
            .find_items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = menu_items
                .get(&line.menu_item_id)
                .ok_or_else(|| ServiceError::not_found("Menu item", line.menu_item_id))?;

            if item.restaurant_id != request.restaurant_id {
                return Err(ServiceError::ValidationError {
                    message: format!(
                        "Menu item {} does not belong to restaurant {}",
                        item.id, request.restaurant_id
                    ),
                });
            }
            if !item.is_available {
                return Err(ServiceError::conflict(format!(
                    "Menu item {} is not available",
                    item.name
                )));
            }

            items.push(NewOrderItem::from_menu_item(item, line.quantity));
        }

        let new_order = NewOrder {
            user_id: current.id,
            restaurant_id: request.restaurant_id,
            delivery_address: request.delivery_address.trim().to_string(),
            contact_phone: request.contact_phone.trim().to_string(),
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            items,
        };

        let order = self.orders.create(new_order).await?;
        crate::info_with_trace!(
            order_id = order.id,
            lines = order.items.len(),
            total_amount = %order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    async fn transition(
        &self,
        current: &CurrentUser,
        id: i64,
        next: OrderStatus,
    ) -> ServiceResult<Order> {
        let order = self.find(id).await?;
        order.check_transition(current, next)?;

        let courier_id = order.courier_after(current, next);
        match self
            .orders
            .update_status(id, order.status, next, courier_id)
            .await?
        {
            StatusUpdate::Updated(updated) => {
                self.tracing
                    .metrics()
                    .record_order_transition(order.status.as_str(), next.as_str());
                crate::info_with_trace!(
                    order_id = id,
                    from = %order.status,
                    to = %next,
                    courier_id = ?updated.courier_id,
                    "Order status updated"
                );
                Ok(updated)
            }
            StatusUpdate::Stale | StatusUpdate::Conflict => {
                warn!(order_id = id, expected = %order.status, "Order changed while updating status");
                Err(ServiceError::conflict(format!(
                    "Order {} was modified concurrently",
                    id
                )))
            }
        }
    }

    async fn find(&self, id: i64) -> ServiceResult<Order> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))
    }
}
