//! Caller authentication for the tenant API

pub mod tenant_auth;

pub use tenant_auth::{CallerIdentity, Role};
