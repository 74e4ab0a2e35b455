//! 审计日志后台 Worker
//!
//! Consumes `AuditLogRequest`s and appends them to the store. Stops when the
//! channel closes.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::AuditLogRequest;
use crate::db::CatalogStore;

pub struct AuditWorker {
    store: Arc<dyn CatalogStore>,
}

impl AuditWorker {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Run until the channel closes
    pub async fn run(self, mut rx: mpsc::Receiver<AuditLogRequest>) {
        tracing::info!("Audit log worker started");

        while let Some(req) = rx.recv().await {
            match self.store.append_audit(&req).await {
                Ok(entry) => {
                    tracing::debug!(
                        audit_id = entry.id,
                        action = %entry.action,
                        resource = %entry.resource_type,
                        "Audit entry recorded"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        action = %req.action,
                        resource_id = %req.resource_id,
                        "Failed to write audit entry: {e}"
                    );
                }
            }
        }

        tracing::info!("Audit log channel closed, worker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditService};
    use crate::db::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_worker_appends_until_closed() {
        let store = Arc::new(MemoryStore::new());
        let (service, rx) = AuditService::new(8);
        let handle = tokio::spawn(AuditWorker::new(store.clone()).run(rx));

        service.record("t1", AuditAction::EntityCreated, "category", 1, None, json!({}));
        service.record("t2", AuditAction::EntityDeleted, "menu_item", 2, None, json!({}));
        drop(service);
        handle.await.unwrap();

        let entries = store.query_audit("t1", 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::EntityCreated);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_worker_running() {
        let store = Arc::new(MemoryStore::new());
        store.fail_audit_writes(true);
        let (service, rx) = AuditService::new(8);
        let handle = tokio::spawn(AuditWorker::new(store.clone()).run(rx));

        service.record("t1", AuditAction::EntityCreated, "category", 1, None, json!({}));
        tokio::task::yield_now().await;
        store.fail_audit_writes(false);
        service.record("t1", AuditAction::EntityUpdated, "category", 1, None, json!({}));
        drop(service);
        handle.await.unwrap();

        let entries = store.query_audit("t1", 10, 0).await.unwrap();
        assert!(entries.iter().any(|e| e.action == AuditAction::EntityUpdated));
    }
}
