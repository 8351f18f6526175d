use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use restaurant_rs::{
    auth::JwtService,
    config::AuthConfig,
    models::{AnalyticsQuery, CreateOrderRequest, CurrentUser, LoginRequest, OrderLineRequest},
    repositories::{seed_if_empty, Database},
    AppState, Metrics,
};

struct Fixture {
    state: AppState,
    customer: CurrentUser,
    admin: CurrentUser,
    restaurant_id: i64,
    item_ids: Vec<i64>,
}

async fn login(state: &AppState, email: &str, password: &str) -> CurrentUser {
    let response = state
        .auth_service
        .login(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
        .expect("login");
    CurrentUser {
        id: response.user.id,
        email: response.user.email,
        role: response.user.role,
    }
}

async fn fixture() -> Fixture {
    let database = Database::in_memory().await.expect("database");
    seed_if_empty(&database).await.expect("seed");

    let jwt = Arc::new(JwtService::from_config(&AuthConfig::default()));
    let metrics = Arc::new(Metrics::new().expect("metrics"));
    let state = AppState::new(database, jwt, metrics);

    let customer = login(&state, "user@restaurant.local", "user123").await;
    let admin = login(&state, "admin@restaurant.local", "admin123").await;

    let restaurant_id = 1;
    let menu = state
        .menu_service
        .get_menu(restaurant_id)
        .await
        .expect("menu");
    let item_ids = menu
        .sections
        .iter()
        .flat_map(|section| section.items.iter())
        .chain(menu.uncategorized.iter())
        .map(|item| item.id)
        .take(5)
        .collect();

    Fixture {
        state,
        customer,
        admin,
        restaurant_id,
        item_ids,
    }
}

fn order_request(fixture: &Fixture, lines: usize) -> CreateOrderRequest {
    CreateOrderRequest {
        restaurant_id: fixture.restaurant_id,
        items: fixture
            .item_ids
            .iter()
            .take(lines)
            .map(|&menu_item_id| OrderLineRequest {
                menu_item_id,
                quantity: 2,
            })
            .collect(),
        delivery_address: "1 Benchmark Avenue".to_string(),
        contact_phone: "+15550100".to_string(),
        notes: None,
    }
}

fn bench_order_creation(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let fixture = rt.block_on(fixture());

    let mut group = c.benchmark_group("create_order");
    for lines in [1usize, 3, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter(|| {
                rt.block_on(async {
                    let order = fixture
                        .state
                        .order_service
                        .create_order(&fixture.customer, order_request(&fixture, lines))
                        .await
                        .expect("order");
                    black_box(order)
                })
            })
        });
    }
    group.finish();
}

fn bench_analytics_summary(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let fixture = rt.block_on(fixture());

    rt.block_on(async {
        for _ in 0..200 {
            fixture
                .state
                .order_service
                .create_order(&fixture.customer, order_request(&fixture, 3))
                .await
                .expect("order");
        }
    });

    c.bench_function("analytics_summary", |b| {
        b.iter(|| {
            rt.block_on(async {
                let summary = fixture
                    .state
                    .analytics_service
                    .summary(
                        &fixture.admin,
                        AnalyticsQuery {
                            restaurant_id: Some(fixture.restaurant_id),
                            from: None,
                            to: None,
                        },
                    )
                    .await
                    .expect("summary");
                black_box(summary)
            })
        })
    });
}

criterion_group!(benches, bench_order_creation, bench_analytics_summary);
criterion_main!(benches);
