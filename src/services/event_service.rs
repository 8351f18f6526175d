use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::user_service::{require_admin, require_staff};
use crate::models::{
    CreateEventRequest, CurrentUser, Event, EventFilters, EventRegistration,
    RegisterEventRequest, RegistrationOutcome, ServiceError, ServiceResult, UpdateEventRequest,
    Validate,
};
use crate::repositories::{EventRepository, RestaurantRepository};

pub struct EventService {
    events: Arc<dyn EventRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
}

impl EventService {
    pub fn new(events: Arc<dyn EventRepository>, restaurants: Arc<dyn RestaurantRepository>) -> Self {
        Self {
            events,
            restaurants,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_events(&self, filters: EventFilters) -> ServiceResult<Vec<Event>> {
        let events = self.events.find_all(filters, Utc::now()).await?;
        info!(count = events.len(), "Listed events");
        Ok(events)
    }

    #[instrument(skip(self))]
    pub async fn get_event(&self, id: i64) -> ServiceResult<Event> {
        self.events
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", id))
    }

    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn create_event(
        &self,
        current: &CurrentUser,
        request: CreateEventRequest,
    ) -> ServiceResult<Event> {
        require_staff(current)?;
        request.validate()?;

        if request.event_date <= Utc::now() {
            return Err(ServiceError::ValidationError {
                message: "Event date must be in the future".to_string(),
            });
        }
        if let Some(restaurant_id) = request.restaurant_id {
            self.restaurants
                .find_by_id(restaurant_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Restaurant", restaurant_id))?;
        }

        let event = self.events.create(request).await?;
        crate::info_with_trace!(event_id = event.id, capacity = event.capacity, "Event created");
        Ok(event)
    }

    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn update_event(
        &self,
        current: &CurrentUser,
        id: i64,
        request: UpdateEventRequest,
    ) -> ServiceResult<Event> {
        require_staff(current)?;
        request.validate()?;

        let mut event = self.get_event(id).await?;

        if let Some(event_date) = request.event_date {
            if event_date <= Utc::now() {
                return Err(ServiceError::ValidationError {
                    message: "Event date must be in the future".to_string(),
                });
            }
            event.event_date = event_date;
        }
        if let Some(capacity) = request.capacity {
            if capacity < event.registered_count {
                return Err(ServiceError::conflict(format!(
                    "Capacity {} is below the {} seats already registered",
                    capacity, event.registered_count
                )));
            }
            event.capacity = capacity;
        }
        if let Some(title) = request.title {
            event.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            event.description = description;
        }
        if let Some(price) = request.price {
            event.price = price;
        }
        if let Some(image_url) = request.image_url {
            event.image_url = Some(image_url);
        }

        let updated = self.events.update(event).await?;
        info!(event_id = id, "Event updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(admin_id = current.id))]
    pub async fn delete_event(&self, current: &CurrentUser, id: i64) -> ServiceResult<()> {
        require_admin(current)?;

        if !self.events.delete(id).await? {
            return Err(ServiceError::not_found("Event", id));
        }

        crate::info_with_trace!(event_id = id, "Event deleted");
        Ok(())
    }

    /// Capacity is re-checked inside the insert transaction
    #[instrument(skip(self, request), fields(user_id = current.id, guests = request.guests))]
    pub async fn register(
        &self,
        current: &CurrentUser,
        event_id: i64,
        request: RegisterEventRequest,
    ) -> ServiceResult<EventRegistration> {
        request.validate()?;

        let event = self.get_event(event_id).await?;
        if !event.is_upcoming(Utc::now()) {
            return Err(ServiceError::conflict("Event has already taken place"));
        }

        match self
            .events
            .register(event_id, current.id, request.guests)
            .await?
        {
            RegistrationOutcome::Registered(registration) => {
                crate::info_with_trace!(
                    event_id,
                    registration_id = registration.id,
                    "Registered for event"
                );
                Ok(registration)
            }
            RegistrationOutcome::AlreadyRegistered => Err(ServiceError::conflict(
                "Already registered for this event",
            )),
            RegistrationOutcome::CapacityExceeded { remaining } => {
                warn!(event_id, remaining, "Event is full");
                Err(ServiceError::CapacityExceeded {
                    requested: request.guests,
                    remaining,
                })
            }
        }
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn unregister(&self, current: &CurrentUser, event_id: i64) -> ServiceResult<()> {
        if !self.events.unregister(event_id, current.id).await? {
            return Err(ServiceError::not_found("Event registration", event_id));
        }

        info!(event_id, "Unregistered from event");
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn list_registrations(
        &self,
        current: &CurrentUser,
        event_id: i64,
    ) -> ServiceResult<Vec<EventRegistration>> {
        require_staff(current)?;
        self.get_event(event_id).await?;
        Ok(self.events.find_registrations(event_id).await?)
    }
}
