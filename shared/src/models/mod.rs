//! Data models shared by qravy-cloud and qravy-client

pub mod catalog;
pub mod overlay;
pub mod scope;

pub use catalog::*;
pub use overlay::*;
pub use scope::*;
