//! Data models
//!
//! Shared between the server and the dashboard (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY, snowflake-generated).

pub mod admin;
pub mod order;
pub mod product;
pub mod visitor;

// Re-exports
pub use admin::*;
pub use order::*;
pub use product::*;
pub use visitor::*;
