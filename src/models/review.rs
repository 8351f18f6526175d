use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CurrentUser, ReviewStatus};

/// A customer review of a restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub restaurant_id: i64,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    pub status: ReviewStatus,
    pub moderated_by: Option<i64>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerateReviewRequest {
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewFilters {
    pub restaurant_id: Option<i64>,
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<Review>,
    pub total_count: usize,
}

/// Approved-review aggregate for one restaurant
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

impl Review {
    pub fn can_be_deleted_by(&self, user: &CurrentUser) -> bool {
        self.user_id == user.id || user.role.can_moderate()
    }
}
