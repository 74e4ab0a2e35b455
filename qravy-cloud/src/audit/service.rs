//! 审计日志服务
//!
//! Mutations hand entries to `AuditService::log`, which queues them on a
//! bounded mpsc channel for the background `AuditWorker`. Logging is
//! best-effort: a full or closed channel never fails the mutation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::{AuditAction, AuditLogRequest};

#[derive(Debug, Clone)]
pub struct AuditService {
    tx: mpsc::Sender<AuditLogRequest>,
}

impl AuditService {
    /// Create the service and the receiver its worker consumes
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Arc::new(Self { tx }), rx)
    }

    /// Queue an audit entry without waiting
    pub fn log(&self, req: AuditLogRequest) {
        match self.tx.try_send(req) {
            Ok(()) => {}
            Err(TrySendError::Full(req)) => {
                tracing::warn!(
                    tenant_id = %req.tenant_id,
                    action = %req.action,
                    resource_id = %req.resource_id,
                    details = %req.details,
                    "Audit channel full, entry logged locally only"
                );
            }
            Err(TrySendError::Closed(req)) => {
                tracing::error!(
                    tenant_id = %req.tenant_id,
                    action = %req.action,
                    resource_id = %req.resource_id,
                    "Audit channel closed, entry lost"
                );
            }
        }
    }

    /// Convenience wrapper building the request
    pub fn record(
        &self,
        tenant_id: &str,
        action: AuditAction,
        resource_type: &str,
        resource_id: i64,
        operator: Option<String>,
        details: serde_json::Value,
    ) {
        self.log(AuditLogRequest {
            tenant_id: tenant_id.to_string(),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            operator,
            details,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_reaches_receiver() {
        let (service, mut rx) = AuditService::new(4);
        service.record(
            "t1",
            AuditAction::EntityCreated,
            "category",
            42,
            Some("owner@example.com".into()),
            json!({"after": {"name": "Drinks"}}),
        );
        let req = rx.recv().await.unwrap();
        assert_eq!(req.action, AuditAction::EntityCreated);
        assert_eq!(req.resource_id, "42");
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block() {
        let (service, mut rx) = AuditService::new(1);
        for id in 0..3 {
            service.record("t1", AuditAction::EntityDeleted, "category", id, None, json!({}));
        }
        assert_eq!(rx.recv().await.unwrap().resource_id, "0");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_channel_is_ignored() {
        let (service, rx) = AuditService::new(1);
        drop(rx);
        service.record("t1", AuditAction::EntityDeleted, "category", 1, None, json!({}));
    }
}
