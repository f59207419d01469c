pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;
pub use api::{ApiError, ResourceHandlers};

// Export logic types
pub use logic::{execute, parse_filter, resolve, resolve_with, NormalizedQuery};

// Export all model types
pub use model::*;

// Export store types
pub use store::{DocumentStore, DocumentStoreExt, MemoryStore, PostgresStore, StoreError};

use crate::config::AppConfig;

/// Build the application router for `store` using the server settings in `config`.
pub fn build_app<S: DocumentStore + 'static>(
    store: std::sync::Arc<S>,
    config: &AppConfig,
) -> axum::Router {
    api::set_development_mode(config.is_development());
    routes::create_router::<S>(&config.server.public_dir).with_state(store)
}
