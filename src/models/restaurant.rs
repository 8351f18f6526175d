use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TableStatus;

/// A restaurant of the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: Option<String>,
    pub cuisine: Option<String>,
    pub opening_hours: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: Option<String>,
    pub cuisine: Option<String>,
    pub opening_hours: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub cuisine: Option<String>,
    pub opening_hours: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RestaurantFilters {
    pub search: Option<String>,
    pub cuisine: Option<String>,
    pub include_inactive: bool,
}

/// Restaurant enriched with its approved-review rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantResponse {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantListResponse {
    pub restaurants: Vec<RestaurantResponse>,
    pub total_count: usize,
}

impl Restaurant {
    /// Apply a partial update in place
    pub fn update(&mut self, request: UpdateRestaurantRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(description) = request.description {
            self.description = description;
        }
        if let Some(address) = request.address {
            self.address = address;
        }
        if let Some(phone) = request.phone {
            self.phone = Some(phone);
        }
        if let Some(cuisine) = request.cuisine {
            self.cuisine = Some(cuisine);
        }
        if let Some(hours) = request.opening_hours {
            self.opening_hours = Some(hours);
        }
        if let Some(image_url) = request.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(is_active) = request.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}

/// A dining table inside a restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub restaurant_id: i64,
    pub number: i64,
    pub seats: u32,
    pub status: TableStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableRequest {
    pub number: i64,
    pub seats: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTableStatusRequest {
    pub status: TableStatus,
}
