use axum::serve;
use booking_api::build_app;
use booking_api::config::{AppConfig, StoreBackend};
use booking_api::seed;
use booking_api::store::{DocumentStore, MemoryStore, PostgresStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::{Builder, Env};
    use log::LevelFilter;

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("sqlx", LevelFilter::Warn) // Suppress sqlx Debug logs
        .init();

    log::info!("Booking API server");

    // Load configuration
    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{} environment={:?} backend={:?}",
        config.server.host,
        config.server.port,
        config.server.environment,
        config.database.backend
    );

    match config.database.backend {
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; data is lost on shutdown");
            serve_with(Arc::new(MemoryStore::new()), &config).await
        }
        StoreBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let postgres_store =
                PostgresStore::new(&database_url, config.max_connections()).await?;

            log::info!("Running database migrations...");
            postgres_store.migrate().await?;

            serve_with(Arc::new(postgres_store), &config).await
        }
    }
}

async fn serve_with<S: DocumentStore + 'static>(
    store: Arc<S>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }

    let app = build_app(store, config);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Booking API running on http://{}/api/v1", bind_address);

    serve(listener, app).await?;

    Ok(())
}
