use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use restaurant_rs::{
    auth::JwtService,
    config::{AuthConfig, ServerConfig},
    create_app,
    repositories::{seed::SEED_ACCOUNTS, seed_if_empty, Database},
    AppState, Metrics,
};

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    _data_dir: Option<TempDir>,
}

impl TestEnvironment {
    /// Start the full application on an ephemeral port, backed by a seeded in-memory database
    pub async fn new() -> Self {
        let database = Database::in_memory()
            .await
            .expect("Failed to open in-memory database");
        Self::start(database, None).await
    }

    /// Same application over a SQLite file with a multi-connection pool
    pub async fn file_backed() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("api.db").display());
        let database = Database::connect(&url, 8)
            .await
            .expect("Failed to open file database");
        database.migrate().await.expect("Failed to migrate");
        Self::start(database, Some(dir)).await
    }

    async fn start(database: Database, data_dir: Option<TempDir>) -> Self {
        seed_if_empty(&database)
            .await
            .expect("Failed to seed test data");

        let jwt = Arc::new(JwtService::from_config(&AuthConfig::default()));
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let state = AppState::new(database, jwt, metrics);
        let app = create_app(state, &ServerConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: Client::new(),
            base_url,
            _data_dir: data_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn put(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to log in");
        assert_eq!(response.status().as_u16(), 200, "login failed for {}", email);

        let body: Value = response.json().await.expect("Failed to parse login response");
        body["token"].as_str().expect("Expected token").to_string()
    }

    /// Log in as one of the seeded accounts by role name
    pub async fn login_as(&self, role: &str) -> String {
        let account = SEED_ACCOUNTS
            .iter()
            .find(|account| account.role.as_str() == role)
            .expect("Unknown seeded role");
        self.login(account.email, account.password).await
    }

    /// Register a fresh customer and return (token, user id)
    pub async fn register_user(&self, email: &str) -> (String, i64) {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "name": "Test Customer",
                "email": email,
                "password": "secret123",
                "phone": "+1 555 0100"
            }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.expect("Failed to parse register response");
        (
            body["token"].as_str().expect("Expected token").to_string(),
            body["user"]["id"].as_i64().expect("Expected user id"),
        )
    }

    /// Create a restaurant with one available menu item; returns (restaurant id, item id)
    pub async fn create_restaurant_with_item(&self, admin: &str, price: &str) -> (i64, i64) {
        let response = self
            .post(
                "/api/restaurants",
                admin,
                json!({
                    "name": "Test Kitchen",
                    "description": "Integration test restaurant",
                    "address": "1 Test Lane",
                    "cuisine": "fusion"
                }),
            )
            .send()
            .await
            .expect("Failed to create restaurant");
        assert_eq!(response.status().as_u16(), 201);
        let restaurant: Value = response.json().await.expect("Failed to parse restaurant");
        let restaurant_id = restaurant["id"].as_i64().expect("Expected restaurant id");

        let response = self
            .post(
                "/api/menu-items",
                admin,
                json!({
                    "restaurant_id": restaurant_id,
                    "name": "House Special",
                    "description": "Chef's choice",
                    "price": price
                }),
            )
            .send()
            .await
            .expect("Failed to create menu item");
        assert_eq!(response.status().as_u16(), 201);
        let item: Value = response.json().await.expect("Failed to parse menu item");

        (restaurant_id, item["id"].as_i64().expect("Expected item id"))
    }

    /// Place a single-line order and return its id
    pub async fn place_order(&self, customer: &str, restaurant_id: i64, item_id: i64) -> i64 {
        let response = self
            .post(
                "/api/orders",
                customer,
                json!({
                    "restaurant_id": restaurant_id,
                    "items": [{ "menu_item_id": item_id, "quantity": 1 }],
                    "delivery_address": "7 Test Street",
                    "contact_phone": "+1 555 0142"
                }),
            )
            .send()
            .await
            .expect("Failed to create order");
        assert_eq!(response.status().as_u16(), 201);
        let order: Value = response.json().await.expect("Failed to parse order");
        order["id"].as_i64().expect("Expected order id")
    }
}

pub fn future_time(hours: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::hours(hours)
}
