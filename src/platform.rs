//! Static marketplace descriptions: endpoints, signing family, token lifetimes, cursor
//! kinds and response schemas.
//!
//! A [`PlatformConfig`] is validated once at construction and then shared read-only by
//! the token manager and every paginator built on it.

mod config;
mod presets;
mod schema;

pub use config::*;
pub use presets::*;
pub use schema::*;
