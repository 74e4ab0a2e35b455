//! Catalog service: read path (resolver) and write path (coordinator)

pub mod coordinator;
pub mod resolver;

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{CatalogEntity, EntityKind, Location};

use crate::audit::{AuditAction, AuditService};
use crate::auth::CallerIdentity;
use crate::db::CatalogStore;
use crate::error::ServiceResult;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    audit: Arc<AuditService>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, audit: Arc<AuditService>) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Load an entity of the caller's tenant or fail with the kind's not-found code
    pub(crate) async fn load_entity(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        id: i64,
    ) -> ServiceResult<CatalogEntity> {
        self.store
            .get_entity(tenant_id, kind, id)
            .await?
            .ok_or_else(|| not_found(kind, id).into())
    }

    pub(crate) async fn require_location(
        &self,
        tenant_id: &str,
        location_id: i64,
    ) -> ServiceResult<Location> {
        self.store
            .get_location(tenant_id, location_id)
            .await?
            .ok_or_else(|| AppError::location_not_found(location_id).into())
    }

    /// Validate a list of locations, returning them deduplicated in input order
    pub(crate) async fn require_locations(
        &self,
        tenant_id: &str,
        location_ids: &[i64],
    ) -> ServiceResult<Vec<i64>> {
        let known = self.tenant_location_ids(tenant_id).await?;
        let mut unique = Vec::with_capacity(location_ids.len());
        for id in location_ids {
            if !known.contains(id) {
                return Err(AppError::location_not_found(*id).into());
            }
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        Ok(unique)
    }

    pub(crate) async fn tenant_location_ids(&self, tenant_id: &str) -> ServiceResult<Vec<i64>> {
        Ok(self
            .store
            .list_locations(tenant_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect())
    }

    pub(crate) fn audit(
        &self,
        caller: &CallerIdentity,
        action: AuditAction,
        entity: &CatalogEntity,
        details: serde_json::Value,
    ) {
        self.audit.record(
            &caller.tenant_id,
            action,
            entity.kind.as_str(),
            entity.id,
            Some(caller.operator()),
            details,
        );
    }
}

pub(crate) fn not_found(kind: EntityKind, id: i64) -> AppError {
    let code = match kind {
        EntityKind::Category => ErrorCode::CategoryNotFound,
        EntityKind::MenuItem => ErrorCode::MenuItemNotFound,
    };
    AppError::new(code).with_detail("id", id)
}

pub(crate) fn name_exists(kind: EntityKind, name: &str) -> AppError {
    let code = match kind {
        EntityKind::Category => ErrorCode::CategoryNameExists,
        EntityKind::MenuItem => ErrorCode::MenuItemNameExists,
    };
    AppError::with_message(code, format!("{kind} \"{name}\" already exists in this scope"))
        .with_detail("name", name)
}
