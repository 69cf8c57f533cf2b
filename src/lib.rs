// src/lib.rs
// Public library surface for integration tests and the binary.

pub mod analysis;
pub mod api;
pub mod config;
pub mod draw;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod sentiment;
pub mod sources;
pub mod store;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::{ServiceError, ValidationError};
pub use crate::tracker::FeedTracker;
