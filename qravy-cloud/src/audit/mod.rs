//! 审计日志模块
//!
//! ```text
//! catalog mutation
//!   └─ AuditService::log() → mpsc (bounded) → AuditWorker → CatalogStore::append_audit
//! ```
//!
//! Best-effort: failures are logged locally and never roll back a mutation.

pub mod service;
pub mod types;
pub mod worker;

pub use service::AuditService;
pub use types::{AuditAction, AuditEntry, AuditLogRequest, AuditQuery};
pub use worker::AuditWorker;
