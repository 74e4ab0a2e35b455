//! qravy-cloud: multi-tenant catalog service
//!
//! - Resolves the effective category / menu item set per (location, channel)
//! - Applies scoped create / update / delete / bulk visibility mutations
//! - Records every state change in the tenant audit log

pub mod api;
pub mod audit;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod state;

pub use config::Config;
pub use state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
