//! Configuration for the ferry relay
//!
//! Loaded once at startup from TOML; missing files fall back to defaults.

mod defaults;
mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::*;
