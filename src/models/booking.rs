use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingStatus, CurrentUser, ServiceError, ServiceResult};

/// How long a confirmed booking holds its table
pub const BOOKING_SLOT_HOURS: i64 = 2;

/// A table reservation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub restaurant_id: i64,
    pub table_id: Option<i64>,
    pub booking_time: DateTime<Utc>,
    pub guests: u32,
    pub contact_name: String,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub restaurant_id: i64,
    pub booking_time: DateTime<Utc>,
    pub guests: u32,
    pub contact_name: String,
    pub contact_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    pub table_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingFilters {
    pub user_id: Option<i64>,
    pub restaurant_id: Option<i64>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub total_count: usize,
}

impl Booking {
    /// Start and end of the slot the booking occupies
    pub fn slot(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        slot_bounds(self.booking_time)
    }

    pub fn is_owned_by(&self, user: &CurrentUser) -> bool {
        self.user_id == user.id
    }

    pub fn can_be_viewed_by(&self, user: &CurrentUser) -> bool {
        self.is_owned_by(user) || user.is_staff_or_admin()
    }

    /// Check both the edge and the caller's right to take it
    pub fn check_transition(&self, actor: &CurrentUser, next: BookingStatus) -> ServiceResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidBookingTransition {
                from: self.status,
                to: next,
            });
        }

        let allowed = match next {
            BookingStatus::Cancelled => self.is_owned_by(actor) || actor.is_staff_or_admin(),
            BookingStatus::Confirmed | BookingStatus::Completed => actor.is_staff_or_admin(),
            BookingStatus::Pending => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(ServiceError::forbidden(format!(
                "role {} cannot move booking {} to {}",
                actor.role, self.id, next
            )))
        }
    }
}

pub fn slot_bounds(start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, start + Duration::hours(BOOKING_SLOT_HOURS))
}

/// Two bookings collide when their slots intersect
pub fn slots_overlap(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    let (a_start, a_end) = slot_bounds(a);
    let (b_start, b_end) = slot_bounds(b);
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: 3,
            user_id: 10,
            restaurant_id: 1,
            table_id: None,
            booking_time: now + Duration::days(1),
            guests: 4,
            contact_name: "Grace".to_string(),
            contact_phone: "+15550100".to_string(),
            notes: None,
            status,
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
    fn test_owner_can_cancel_but_not_confirm() {
        let pending = booking(BookingStatus::Pending);
        let owner = actor(10, Role::User);

        assert!(pending.check_transition(&owner, BookingStatus::Cancelled).is_ok());
        assert!(matches!(
            pending.check_transition(&owner, BookingStatus::Confirmed),
            Err(ServiceError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_staff_confirms_and_completes() {
        let staff = actor(2, Role::Staff);

        assert!(booking(BookingStatus::Pending)
            .check_transition(&staff, BookingStatus::Confirmed)
            .is_ok());
        assert!(booking(BookingStatus::Confirmed)
            .check_transition(&staff, BookingStatus::Completed)
            .is_ok());
    }

    #[test]
    fn test_other_user_cannot_cancel() {
        let stranger = actor(11, Role::User);
        assert!(booking(BookingStatus::Pending)
            .check_transition(&stranger, BookingStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn test_invalid_edge_rejected_before_role_check() {
        let admin = actor(1, Role::Admin);
        let result = booking(BookingStatus::Completed).check_transition(&admin, BookingStatus::Pending);

        assert!(matches!(
            result,
            Err(ServiceError::InvalidBookingTransition { .. })
        ));
    }

    #[test]
    fn test_slot_overlap() {
        let base = Utc::now();

        assert!(slots_overlap(base, base + Duration::minutes(90)));
        assert!(slots_overlap(base + Duration::minutes(90), base));
        assert!(!slots_overlap(base, base + Duration::hours(2)));
        assert!(!slots_overlap(base, base - Duration::hours(3)));
    }
}
