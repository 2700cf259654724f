//! Shared types for the Feria backend
//!
//! Common types used by the server and tooling: data models, the unified
//! error system, bus event envelopes and small utilities.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{BusMessage, EventType};
