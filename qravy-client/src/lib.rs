//! Qravy Client - catalog API client and cache synchronizer
//!
//! - [`HttpClient`]: network calls to the qravy-cloud tenant API
//! - [`cache`]: resolved list partitions patched locally after mutations
//! - [`OptimisticCatalog`]: optimistic patches with rollback on failure

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod optimistic;

pub use api::CatalogApi;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use optimistic::OptimisticCatalog;

// Re-export shared types for convenience
pub use shared::ApiResponse;
pub use shared::models::{CatalogEntity, Channel, ChannelScope, EntityKind};
