pub mod booking;
pub mod collection;
pub mod common;
pub mod query;
pub mod resource;
pub mod review;
pub mod room;
pub mod user;
pub mod user_context;

pub use booking::*;
pub use collection::*;
pub use common::*;
pub use query::*;
pub use resource::*;
pub use review::*;
pub use room::*;
pub use user::*;
pub use user_context::*;
