//! Shared types for the Qravy catalog
//!
//! Domain models, error types and the visibility resolution rules used by
//! both the cloud service and the client cache.

pub mod error;
pub mod models;
pub mod util;
pub mod visibility;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use models::{CatalogEntity, Channel, ChannelScope, EntityKind, ScopeState};
