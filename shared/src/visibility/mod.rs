//! Visibility resolution
//!
//! Pure functions shared by the cloud service (read path) and the client
//! cache (optimistic patches), so both sides apply the same precedence:
//! `tombstone > explicit overlay value > baseline(true)`.

pub mod aggregate;
pub mod index;
pub mod resolve;

pub use aggregate::{Aggregate, aggregate_any, aggregate_channels};
pub use index::OverlayIndex;
pub use resolve::{included_at, is_visible, resolve};
