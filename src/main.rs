use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use restaurant_rs::{
    auth::JwtService,
    create_app, init_observability,
    repositories::{seed_if_empty, Database},
    shutdown_observability, AppState, Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment().context("Failed to load configuration")?;
    println!("Configuration loaded successfully");

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!("Database: {}", config.database.database_url);

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let database = Database::from_config(&config.database)
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    if config.database.seed_on_startup {
        match seed_if_empty(&database).await {
            Ok(report) if report.seeded => info!(
                "Seeded {} restaurants, {} menu items, {} users",
                report.restaurants, report.menu_items, report.users
            ),
            Ok(_) => info!("Existing data found, skipping seed"),
            Err(e) => error!("Seeding failed: {}", e),
        }
    }

    let jwt = Arc::new(JwtService::from_config(&config.auth));
    let state = AppState::new(database.clone(), jwt, metrics);
    info!("Services initialized successfully");

    let app = create_app(state, &config.server);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid server host")?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
