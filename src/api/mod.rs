pub mod error;
pub mod handlers;
pub mod resource_handlers;
pub mod routes;
pub mod user_extractor;

pub use error::*;
pub use handlers::*;
pub use resource_handlers::*;
pub use routes::*;
