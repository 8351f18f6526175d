use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A ticketed restaurant event (tasting, workshop, live music)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub restaurant_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub capacity: u32,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub registered_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.registered_count)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.event_date > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub restaurant_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub capacity: u32,
    #[serde(default)]
    pub price: Decimal,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventFilters {
    pub restaurant_id: Option<i64>,
    pub upcoming_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<Event>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRegistration {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub guests: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterEventRequest {
    #[serde(default = "default_guests")]
    pub guests: u32,
}

fn default_guests() -> u32 {
    1
}

impl Default for RegisterEventRequest {
    fn default() -> Self {
        Self {
            guests: default_guests(),
        }
    }
}

/// Outcome of a transactional registration attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Registered(EventRegistration),
    AlreadyRegistered,
    CapacityExceeded { remaining: u32 },
}
