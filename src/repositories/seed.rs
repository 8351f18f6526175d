use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument, Instrument};

use super::database::{db_span, Database};
use crate::auth::hash_password;
use crate::models::{RepositoryError, Role, ServiceResult};

/// What a seeding run inserted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub seeded: bool,
    pub restaurants: usize,
    pub menu_categories: usize,
    pub menu_items: usize,
    pub tables: usize,
    pub events: usize,
    pub users: usize,
}

/// Demo account created for every role
#[derive(Debug, Clone, Copy)]
pub struct SeedAccount {
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

pub const SEED_ACCOUNTS: [SeedAccount; 5] = [
    SeedAccount {
        name: "Admin",
        email: "admin@restaurant.local",
        password: "admin123",
        role: Role::Admin,
    },
    SeedAccount {
        name: "Moderator",
        email: "moderator@restaurant.local",
        password: "moderator123",
        role: Role::Moderator,
    },
    SeedAccount {
        name: "Staff",
        email: "staff@restaurant.local",
        password: "staff123",
        role: Role::Staff,
    },
    SeedAccount {
        name: "Courier",
        email: "courier@restaurant.local",
        password: "courier123",
        role: Role::Courier,
    },
    SeedAccount {
        name: "Guest",
        email: "user@restaurant.local",
        password: "user123",
        role: Role::User,
    },
];

struct SeedItem {
    name: &'static str,
    description: &'static str,
    price_cents: i64,
}

struct SeedCategory {
    name: &'static str,
    items: &'static [SeedItem],
}

struct SeedRestaurant {
    name: &'static str,
    description: &'static str,
    address: &'static str,
    phone: &'static str,
    cuisine: &'static str,
    opening_hours: &'static str,
    image_url: &'static str,
    table_seats: &'static [i64],
    categories: &'static [SeedCategory],
}

struct SeedEvent {
    title: &'static str,
    description: &'static str,
    days_ahead: i64,
    capacity: i64,
    price_cents: i64,
    restaurant_index: Option<usize>,
}

const RESTAURANTS: &[SeedRestaurant] = &[
    SeedRestaurant {
        name: "Trattoria Centrale",
        description: "Wood-fired pizza and fresh pasta in the old town",
        address: "12 Market Square",
        phone: "+1 555 0101",
        cuisine: "italian",
        opening_hours: "11:00-23:00",
        image_url: "/images/restaurants/trattoria.jpg",
        table_seats: &[2, 2, 4, 4, 6, 8],
        categories: &[
            SeedCategory {
                name: "Pizza",
                items: &[
                    SeedItem {
                        name: "Margherita",
                        description: "Tomato, mozzarella, basil",
                        price_cents: 1090,
                    },
                    SeedItem {
                        name: "Diavola",
                        description: "Spicy salami, chili oil",
                        price_cents: 1290,
                    },
                ],
            },
            SeedCategory {
                name: "Pasta",
                items: &[
                    SeedItem {
                        name: "Carbonara",
                        description: "Guanciale, egg yolk, pecorino",
                        price_cents: 1350,
                    },
                    SeedItem {
                        name: "Pesto Genovese",
                        description: "Trofie with basil pesto",
                        price_cents: 1190,
                    },
                ],
            },
            SeedCategory {
                name: "Desserts",
                items: &[SeedItem {
                    name: "Tiramisu",
                    description: "Mascarpone, espresso, cocoa",
                    price_cents: 650,
                }],
            },
        ],
    },
    SeedRestaurant {
        name: "Sakura Garden",
        description: "Sushi bar and ramen kitchen",
        address: "48 Harbour Road",
        phone: "+1 555 0202",
        cuisine: "japanese",
        opening_hours: "12:00-22:30",
        image_url: "/images/restaurants/sakura.jpg",
        table_seats: &[2, 4, 4, 6],
        categories: &[
            SeedCategory {
                name: "Sushi",
                items: &[
                    SeedItem {
                        name: "Salmon Nigiri Set",
                        description: "Eight pieces of salmon nigiri",
                        price_cents: 1680,
                    },
                    SeedItem {
                        name: "Dragon Roll",
                        description: "Eel, avocado, cucumber",
                        price_cents: 1450,
                    },
                ],
            },
            SeedCategory {
                name: "Ramen",
                items: &[SeedItem {
                    name: "Tonkotsu Ramen",
                    description: "Pork broth, chashu, soft egg",
                    price_cents: 1390,
                }],
            },
        ],
    },
    SeedRestaurant {
        name: "Grill House",
        description: "Steaks and burgers from the charcoal grill",
        address: "3 Station Street",
        phone: "+1 555 0303",
        cuisine: "american",
        opening_hours: "12:00-00:00",
        image_url: "/images/restaurants/grill.jpg",
        table_seats: &[2, 4, 4, 4, 8, 10],
        categories: &[
            SeedCategory {
                name: "Burgers",
                items: &[
                    SeedItem {
                        name: "Classic Burger",
                        description: "Beef patty, cheddar, pickles",
                        price_cents: 1250,
                    },
                    SeedItem {
                        name: "Mushroom Swiss",
                        description: "Beef patty, mushrooms, emmental",
                        price_cents: 1390,
                    },
                ],
            },
            SeedCategory {
                name: "Steaks",
                items: &[SeedItem {
                    name: "Ribeye 300g",
                    description: "Dry-aged ribeye with fries",
                    price_cents: 2890,
                }],
            },
            SeedCategory {
                name: "Drinks",
                items: &[SeedItem {
                    name: "Lemonade",
                    description: "House-made lemonade",
                    price_cents: 390,
                }],
            },
        ],
    },
];

const EVENTS: &[SeedEvent] = &[
    SeedEvent {
        title: "Pasta Masterclass",
        description: "Learn to make fresh pasta with our head chef",
        days_ahead: 14,
        capacity: 20,
        price_cents: 4500,
        restaurant_index: Some(0),
    },
    SeedEvent {
        title: "Sake Tasting Night",
        description: "Six sakes paired with small plates",
        days_ahead: 21,
        capacity: 30,
        price_cents: 3500,
        restaurant_index: Some(1),
    },
    SeedEvent {
        title: "Chain Anniversary Party",
        description: "Live music and a free welcome drink",
        days_ahead: 30,
        capacity: 200,
        price_cents: 0,
        restaurant_index: None,
    },
];

/// Insert the demo data when no restaurant exists yet
#[instrument(skip(database))]
pub async fn seed_if_empty(database: &Database) -> ServiceResult<SeedReport> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM restaurants")
        .fetch_one(database.pool())
        .instrument(db_span("SELECT", "restaurants"))
        .await
        .map_err(RepositoryError::from)?;

    if existing > 0 {
        info!(existing, "Database already holds restaurants, skipping seed");
        return Ok(SeedReport::default());
    }

    // Hashing stays outside the write transaction
    let mut accounts = Vec::with_capacity(SEED_ACCOUNTS.len());
    for account in SEED_ACCOUNTS.iter() {
        accounts.push((account, hash_password(account.password)?));
    }

    let mut tx = database
        .pool()
        .begin()
        .await
        .map_err(RepositoryError::from)?;
    let report = insert_seed_data(&mut tx, &accounts)
        .await
        .map_err(RepositoryError::from)?;
    tx.commit()
        .await
        .map_err(RepositoryError::from)?;

    info!(
        restaurants = report.restaurants,
        menu_items = report.menu_items,
        users = report.users,
        "Seed data inserted"
    );
    Ok(report)
}

async fn insert_seed_data(
    tx: &mut Transaction<'_, Sqlite>,
    accounts: &[(&SeedAccount, String)],
) -> Result<SeedReport, sqlx::Error> {
    let now = Utc::now();
    let mut report = SeedReport {
        seeded: true,
        ..SeedReport::default()
    };

    for (account, password_hash) in accounts {
        // Accounts survive a catalogue wipe
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (name, email, phone, role, password_hash, created_at, updated_at) \
             VALUES (?, ?, NULL, ?, ?, ?, ?)",
        )
        .bind(account.name)
        .bind(account.email)
        .bind(account.role.as_str())
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        report.users += result.rows_affected() as usize;
    }

    let mut restaurant_ids = Vec::with_capacity(RESTAURANTS.len());
    for restaurant in RESTAURANTS {
        let restaurant_id = sqlx::query(
            "INSERT INTO restaurants \
             (name, description, address, phone, cuisine, opening_hours, image_url, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(restaurant.name)
        .bind(restaurant.description)
        .bind(restaurant.address)
        .bind(restaurant.phone)
        .bind(restaurant.cuisine)
        .bind(restaurant.opening_hours)
        .bind(restaurant.image_url)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();
        restaurant_ids.push(restaurant_id);
        report.restaurants += 1;

        for (index, seats) in restaurant.table_seats.iter().enumerate() {
            sqlx::query(
                "INSERT INTO tables (restaurant_id, number, seats, status) VALUES (?, ?, ?, 'available')",
            )
            .bind(restaurant_id)
            .bind(index as i64 + 1)
            .bind(*seats)
            .execute(&mut **tx)
            .await?;
            report.tables += 1;
        }

        for (sort_order, category) in restaurant.categories.iter().enumerate() {
            let category_id = sqlx::query(
                "INSERT INTO menu_categories (restaurant_id, name, sort_order) VALUES (?, ?, ?)",
            )
            .bind(restaurant_id)
            .bind(category.name)
            .bind(sort_order as i64)
            .execute(&mut **tx)
            .await?
            .last_insert_rowid();
            report.menu_categories += 1;

            for item in category.items {
                sqlx::query(
                    "INSERT INTO menu_items \
                     (restaurant_id, category_id, name, description, price_cents, image_url, is_available, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, NULL, 1, ?, ?)",
                )
                .bind(restaurant_id)
                .bind(category_id)
                .bind(item.name)
                .bind(item.description)
                .bind(item.price_cents)
                .bind(now)
                .bind(now)
                .execute(&mut **tx)
                .await?;
                report.menu_items += 1;
            }
        }
    }

    for event in EVENTS {
        let restaurant_id = event
            .restaurant_index
            .and_then(|index| restaurant_ids.get(index).copied());
        sqlx::query(
            "INSERT INTO events \
             (restaurant_id, title, description, event_date, capacity, price_cents, image_url, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?)",
        )
        .bind(restaurant_id)
        .bind(event.title)
        .bind(event.description)
        .bind(now + Duration::days(event.days_ahead))
        .bind(event.capacity)
        .bind(event.price_cents)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        report.events += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{from_cents, to_cents};

    #[test]
    fn test_seed_prices_round_trip_through_cents() {
        for item in RESTAURANTS
            .iter()
            .flat_map(|r| r.categories.iter())
            .flat_map(|c| c.items.iter())
        {
            assert!(item.price_cents > 0);
            assert_eq!(to_cents(from_cents(item.price_cents)), item.price_cents);
        }
    }

    #[test]
    fn test_one_account_per_role() {
        for role in [Role::Admin, Role::Moderator, Role::Staff, Role::Courier, Role::User] {
            assert_eq!(SEED_ACCOUNTS.iter().filter(|a| a.role == role).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_seed_runs_once() {
        let database = Database::in_memory().await.unwrap();

        let first = seed_if_empty(&database).await.unwrap();
        assert!(first.seeded);
        assert_eq!(first.restaurants, RESTAURANTS.len());
        assert_eq!(first.users, SEED_ACCOUNTS.len());
        assert_eq!(first.events, EVENTS.len());

        let second = seed_if_empty(&database).await.unwrap();
        assert!(!second.seeded);
        assert_eq!(second.restaurants, 0);
    }
}
