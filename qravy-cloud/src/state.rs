//! Application state for qravy-cloud

use std::sync::Arc;

use crate::BoxError;
use crate::audit::{AuditService, AuditWorker};
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::db::{CatalogStore, MemoryStore, PgStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub audit: Arc<AuditService>,
    /// JWT secret for tenant authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Create state from configuration
    ///
    /// Uses PostgreSQL when `DATABASE_URL` is set, otherwise (development
    /// only) an in-memory store.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn CatalogStore> = match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url).await?;
                tracing::info!("PostgreSQL store ready (migrations applied)");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_store(
            store,
            config.jwt_secret.clone(),
            config.audit_buffer_size,
        ))
    }

    /// Build state around an existing store and start the audit worker
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_store(store: Arc<dyn CatalogStore>, jwt_secret: String, audit_buffer_size: usize) -> Self {
        let (audit, rx) = AuditService::new(audit_buffer_size);
        tokio::spawn(AuditWorker::new(store.clone()).run(rx));
        Self {
            catalog: CatalogService::new(store, audit.clone()),
            audit,
            jwt_secret,
        }
    }
}
