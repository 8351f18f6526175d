use rust_decimal::Decimal;

use super::{
    CreateBookingRequest, CreateEventRequest, CreateMenuCategoryRequest, CreateMenuItemRequest,
    CreateOrderRequest, CreateRestaurantRequest, CreateReviewRequest, CreateTableRequest,
    LoginRequest, RegisterEventRequest, RegisterRequest, UpdateEventRequest,
    UpdateMenuItemRequest, UpdateProfileRequest, UpdateRestaurantRequest, ValidationError,
    ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_PERSON_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_PHONE_LENGTH: usize = 32;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_ADDRESS_LENGTH: usize = 300;
pub const MAX_NOTES_LENGTH: usize = 500;
pub const MAX_IMAGE_URL_LENGTH: usize = 500;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01
pub const MAX_PRICE: Decimal = Decimal::from_parts(999999, 0, 0, false, 2); // 9999.99
pub const MIN_TABLE_SEATS: u32 = 1;
pub const MAX_TABLE_SEATS: u32 = 20;
pub const MIN_BOOKING_GUESTS: u32 = 1;
pub const MAX_BOOKING_GUESTS: u32 = 20;
pub const MAX_ORDER_LINES: usize = 50;
pub const MIN_ORDER_QUANTITY: u32 = 1;
pub const MAX_ORDER_QUANTITY: u32 = 100;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MIN_EVENT_CAPACITY: u32 = 1;
pub const MAX_EVENT_CAPACITY: u32 = 1000;
pub const MIN_EVENT_GUESTS: u32 = 1;
pub const MAX_EVENT_GUESTS: u32 = 10;

impl Validate for RegisterRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("name", &self.name, MAX_PERSON_NAME_LENGTH)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_optional_phone(&self.phone)?;
        Ok(())
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> ValidationResult<()> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::RequiredField {
                field: "email".to_string(),
            });
        }
        if self.password.is_empty() {
            return Err(ValidationError::RequiredField {
                field: "password".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_text("name", name, MAX_PERSON_NAME_LENGTH)?;
        }
        validate_optional_phone(&self.phone)?;
        Ok(())
    }
}

impl Validate for CreateRestaurantRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("name", &self.name, MAX_NAME_LENGTH)?;
        validate_max_length("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_text("address", &self.address, MAX_ADDRESS_LENGTH)?;
        validate_optional_phone(&self.phone)?;
        validate_optional_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for UpdateRestaurantRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_text("name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(description) = &self.description {
            validate_max_length("description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(address) = &self.address {
            validate_text("address", address, MAX_ADDRESS_LENGTH)?;
        }
        validate_optional_phone(&self.phone)?;
        validate_optional_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for CreateTableRequest {
    fn validate(&self) -> ValidationResult<()> {
        if self.number < 1 {
            return Err(ValidationError::InvalidValue {
                field: "number".to_string(),
                value: self.number.to_string(),
                reason: "Table number must be positive".to_string(),
            });
        }
        validate_range("seats", self.seats, MIN_TABLE_SEATS, MAX_TABLE_SEATS)
    }
}

impl Validate for CreateMenuCategoryRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("category_name", &self.name, MAX_PERSON_NAME_LENGTH)
    }
}

impl Validate for CreateMenuItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("name", &self.name, MAX_NAME_LENGTH)?;
        validate_max_length("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_price(&self.price)?;
        validate_optional_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for UpdateMenuItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_text("name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(description) = &self.description {
            validate_max_length("description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        validate_optional_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for CreateBookingRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_range(
            "guests",
            self.guests,
            MIN_BOOKING_GUESTS,
            MAX_BOOKING_GUESTS,
        )?;
        validate_text("contact_name", &self.contact_name, MAX_PERSON_NAME_LENGTH)?;
        validate_phone(&self.contact_phone)?;
        validate_optional_notes(&self.notes)?;
        Ok(())
    }
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> ValidationResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::RequiredField {
                field: "items".to_string(),
            });
        }

        if self.items.len() > MAX_ORDER_LINES {
            return Err(ValidationError::InvalidValue {
                field: "items".to_string(),
                value: self.items.len().to_string(),
                reason: format!("Too many order lines, maximum allowed: {}", MAX_ORDER_LINES),
            });
        }

        for (index, line) in self.items.iter().enumerate() {
            validate_range(
                &format!("items[{}].quantity", index),
                line.quantity,
                MIN_ORDER_QUANTITY,
                MAX_ORDER_QUANTITY,
            )?;
        }

        validate_text("delivery_address", &self.delivery_address, MAX_ADDRESS_LENGTH)?;
        validate_phone(&self.contact_phone)?;
        validate_optional_notes(&self.notes)?;
        Ok(())
    }
}

impl Validate for CreateReviewRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_rating(self.rating)?;
        validate_max_length("comment", &self.comment, MAX_COMMENT_LENGTH)?;
        Ok(())
    }
}

impl Validate for CreateEventRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("title", &self.title, MAX_NAME_LENGTH)?;
        validate_max_length("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_range(
            "capacity",
            self.capacity,
            MIN_EVENT_CAPACITY,
            MAX_EVENT_CAPACITY,
        )?;
        validate_ticket_price(&self.price)?;
        validate_optional_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for UpdateEventRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(title) = &self.title {
            validate_text("title", title, MAX_NAME_LENGTH)?;
        }
        if let Some(description) = &self.description {
            validate_max_length("description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(capacity) = self.capacity {
            validate_range("capacity", capacity, MIN_EVENT_CAPACITY, MAX_EVENT_CAPACITY)?;
        }
        if let Some(price) = &self.price {
            validate_ticket_price(price)?;
        }
        validate_optional_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for RegisterEventRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_range("guests", self.guests, MIN_EVENT_GUESTS, MAX_EVENT_GUESTS)
    }
}

/// Required free text: non-blank after trimming, no control characters, bounded length
pub fn validate_text(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    validate_max_length(field, trimmed, max_length)?;

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Length cap counted in characters
pub fn validate_max_length(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    let length = value.trim().chars().count();
    if length > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
            actual_length: length,
        });
    }
    Ok(())
}

pub fn validate_range(field: &str, value: u32, min: u32, max: u32) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate email address shape
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "email".to_string(),
        });
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max_length: MAX_EMAIL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !trimmed.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            expected: "name@domain.tld".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min_length: MIN_PASSWORD_LENGTH,
            actual_length: length,
        });
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max_length: MAX_PASSWORD_LENGTH,
            actual_length: length,
        });
    }

    Ok(())
}

/// Digits plus the usual separators, optionally starting with '+'
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "phone".to_string(),
        });
    }

    if trimmed.len() > MAX_PHONE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max_length: MAX_PHONE_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if !allowed || digits < 5 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            expected: "Digits with optional +, spaces, dashes or parentheses".to_string(),
        });
    }

    Ok(())
}

pub fn validate_optional_phone(phone: &Option<String>) -> ValidationResult<()> {
    match phone {
        Some(phone) if !phone.trim().is_empty() => validate_phone(phone),
        _ => Ok(()),
    }
}

pub fn validate_optional_notes(notes: &Option<String>) -> ValidationResult<()> {
    match notes {
        Some(notes) => validate_max_length("notes", notes, MAX_NOTES_LENGTH),
        None => Ok(()),
    }
}

/// Absolute http(s) URL or a site-relative path
pub fn validate_optional_image_url(image_url: &Option<String>) -> ValidationResult<()> {
    let Some(url) = image_url else {
        return Ok(());
    };
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Ok(());
    }

    if trimmed.len() > MAX_IMAGE_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "image_url".to_string(),
            max_length: MAX_IMAGE_URL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://") || trimmed.starts_with('/'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "image_url".to_string(),
            expected: "http(s) URL or absolute path".to_string(),
        });
    }

    Ok(())
}

/// Validate menu price
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    if *price < MIN_PRICE || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: MIN_PRICE.to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    validate_price_scale(price)
}

/// Event tickets may be free
pub fn validate_ticket_price(price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: "0".to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    validate_price_scale(price)
}

fn validate_price_scale(price: &Decimal) -> ValidationResult<()> {
    if price.normalize().scale() > 2 {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            value: price.to_string(),
            reason: "Price cannot have more than 2 decimal places".to_string(),
        });
    }
    Ok(())
}

pub fn validate_rating(rating: u8) -> ValidationResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: MIN_RATING.to_string(),
            max: MAX_RATING.to_string(),
            value: rating.to_string(),
        });
    }
    Ok(())
}
