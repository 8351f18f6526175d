use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CurrentUser, MenuItem, OrderStatus, Role, ServiceError, ServiceResult};

/// A delivery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub restaurant_id: i64,
    pub courier_id: Option<i64>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order line; name and price are copied from the menu at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub menu_item_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: i64,
    pub items: Vec<OrderLineRequest>,
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Listing filters; `courier_id` restricts to a courier's work queue
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderFilters {
    pub user_id: Option<i64>,
    pub restaurant_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub courier_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub total_count: usize,
}

/// Priced order line ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl NewOrderItem {
    pub fn from_menu_item(item: &MenuItem, quantity: u32) -> Self {
        Self {
            menu_item_id: item.id,
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Validated order ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub restaurant_id: i64,
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(NewOrderItem::line_total).sum()
    }
}

/// Collapse repeated menu items into one line each, preserving first-seen order
pub fn merge_order_lines(lines: &[OrderLineRequest]) -> Vec<OrderLineRequest> {
    let mut merged: Vec<OrderLineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged
            .iter_mut()
            .find(|existing| existing.menu_item_id == line.menu_item_id)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }
    merged
}

impl Order {
    pub fn is_owned_by(&self, user: &CurrentUser) -> bool {
        self.user_id == user.id
    }

    pub fn is_assigned_to(&self, user: &CurrentUser) -> bool {
        self.courier_id == Some(user.id)
    }

    pub fn can_be_viewed_by(&self, user: &CurrentUser) -> bool {
        match user.role {
            Role::Admin | Role::Staff => true,
            Role::Courier => {
                self.is_assigned_to(user)
                    || (self.status == OrderStatus::Preparing && self.courier_id.is_none())
                    || self.is_owned_by(user)
            }
            Role::User | Role::Moderator => self.is_owned_by(user),
        }
    }

    /// Enforce the delivery state machine and who may drive each edge
    pub fn check_transition(&self, actor: &CurrentUser, next: OrderStatus) -> ServiceResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidOrderTransition {
                from: self.status,
                to: next,
            });
        }

        let allowed = match (self.status, next) {
            (OrderStatus::Pending, OrderStatus::Accepted)
            | (OrderStatus::Accepted, OrderStatus::Preparing) => actor.is_staff_or_admin(),
            (OrderStatus::Preparing, OrderStatus::OnWay) => match actor.role {
                Role::Admin => true,
                Role::Courier => self.courier_id.is_none() || self.is_assigned_to(actor),
                _ => false,
            },
            (OrderStatus::OnWay, OrderStatus::Delivered) => {
                actor.is_admin() || (actor.role == Role::Courier && self.is_assigned_to(actor))
            }
            (OrderStatus::Pending, OrderStatus::Cancelled) => {
                actor.is_staff_or_admin() || self.is_owned_by(actor)
            }
            (_, OrderStatus::Cancelled) => actor.is_staff_or_admin(),
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(ServiceError::forbidden(format!(
                "role {} cannot move order {} from {} to {}",
                actor.role, self.id, self.status, next
            )))
        }
    }

    /// Courier that ends up on the order after `next` is applied by `actor`
    pub fn courier_after(&self, actor: &CurrentUser, next: OrderStatus) -> Option<i64> {
        if next == OrderStatus::OnWay && actor.role == Role::Courier {
            Some(actor.id)
        } else {
            self.courier_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus, courier_id: Option<i64>) -> Order {
        let now = Utc::now();
        Order {
            id: 5,
            user_id: 10,
            restaurant_id: 1,
            courier_id,
            status,
            total_amount: dec!(25.00),
            delivery_address: "12 Elm Street".to_string(),
            contact_phone: "+15550100".to_string(),
            notes: None,
            items: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn actor(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("{}@example.com", id),
            role,
        }
    }

    #[test]
    fn test_happy_path_roles() {
        let staff = actor(2, Role::Staff);
        let courier = actor(3, Role::Courier);

        assert!(order(OrderStatus::Pending, None)
            .check_transition(&staff, OrderStatus::Accepted)
            .is_ok());
        assert!(order(OrderStatus::Accepted, None)
            .check_transition(&staff, OrderStatus::Preparing)
            .is_ok());
        assert!(order(OrderStatus::Preparing, None)
            .check_transition(&courier, OrderStatus::OnWay)
            .is_ok());
        assert!(order(OrderStatus::OnWay, Some(3))
            .check_transition(&courier, OrderStatus::Delivered)
            .is_ok());
    }

    #[test]
    fn test_courier_cannot_accept() {
        let courier = actor(3, Role::Courier);
        let result = order(OrderStatus::Pending, None).check_transition(&courier, OrderStatus::Accepted);

        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[test]
    fn test_only_assigned_courier_delivers() {
        let other_courier = actor(4, Role::Courier);
        let result = order(OrderStatus::OnWay, Some(3))
            .check_transition(&other_courier, OrderStatus::Delivered);

        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[test]
    fn test_owner_cancels_only_while_pending() {
        let owner = actor(10, Role::User);

        assert!(order(OrderStatus::Pending, None)
            .check_transition(&owner, OrderStatus::Cancelled)
            .is_ok());
        assert!(matches!(
            order(OrderStatus::Accepted, None).check_transition(&owner, OrderStatus::Cancelled),
            Err(ServiceError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let admin = actor(1, Role::Admin);
        for next in OrderStatus::ALL {
            assert!(order(OrderStatus::Delivered, Some(3))
                .check_transition(&admin, next)
                .is_err());
        }
    }

    #[test]
    fn test_courier_assignment_on_pickup() {
        let courier = actor(3, Role::Courier);
        let admin = actor(1, Role::Admin);
        let preparing = order(OrderStatus::Preparing, None);

        assert_eq!(preparing.courier_after(&courier, OrderStatus::OnWay), Some(3));
        assert_eq!(preparing.courier_after(&admin, OrderStatus::OnWay), None);
    }

    #[test]
    fn test_visibility() {
        let preparing = order(OrderStatus::Preparing, None);

        assert!(preparing.can_be_viewed_by(&actor(3, Role::Courier)));
        assert!(preparing.can_be_viewed_by(&actor(10, Role::User)));
        assert!(!preparing.can_be_viewed_by(&actor(11, Role::User)));
        assert!(!preparing.can_be_viewed_by(&actor(12, Role::Moderator)));

        let assigned = order(OrderStatus::OnWay, Some(3));
        assert!(!assigned.can_be_viewed_by(&actor(4, Role::Courier)));
    }

    #[test]
    fn test_merge_order_lines() {
        let merged = merge_order_lines(&[
            OrderLineRequest {
                menu_item_id: 1,
                quantity: 2,
            },
            OrderLineRequest {
                menu_item_id: 2,
                quantity: 1,
            },
            OrderLineRequest {
                menu_item_id: 1,
                quantity: 3,
            },
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].menu_item_id, 1);
        assert_eq!(merged[0].quantity, 5);
    }

    #[test]
    fn test_new_order_total() {
        let new_order = NewOrder {
            user_id: 10,
            restaurant_id: 1,
            delivery_address: "12 Elm Street".to_string(),
            contact_phone: "+15550100".to_string(),
            notes: None,
            items: vec![
                NewOrderItem {
                    menu_item_id: 1,
                    name: "Soup".to_string(),
                    unit_price: dec!(4.50),
                    quantity: 2,
                },
                NewOrderItem {
                    menu_item_id: 2,
                    name: "Bread".to_string(),
                    unit_price: dec!(1.25),
                    quantity: 3,
                },
            ],
        };

        assert_eq!(new_order.total_amount(), dec!(12.75));
    }
}
