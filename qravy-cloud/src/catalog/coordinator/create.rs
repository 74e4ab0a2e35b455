//! Create

use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{CatalogEntity, ChannelScope, EntityCreate, EntityKind, ScopeState};
use shared::util::{now_millis, snowflake_id};

use super::{fan_out, validated_name};
use crate::audit::AuditAction;
use crate::auth::CallerIdentity;
use crate::catalog::{CatalogService, not_found};
use crate::error::ServiceResult;

impl CatalogService {
    /// `create(tenant, name, location?, channel?, include?, exclude?)`
    ///
    /// Include/exclude lists only apply to global entities. An include-list
    /// writes `visible=true` overlays which change nothing against the
    /// baseline default; they are kept so a later baseline change has them.
    pub async fn create(
        &self,
        caller: &CallerIdentity,
        kind: EntityKind,
        payload: EntityCreate,
    ) -> ServiceResult<CatalogEntity> {
        caller.require_write()?;
        let tenant_id = caller.tenant_id.as_str();
        let name = validated_name(&payload.name)?;

        let location_id = caller.scoped_location(payload.location_id)?;
        if let Some(id) = location_id {
            self.require_location(tenant_id, id).await?;
        }

        let category_id = match kind {
            EntityKind::Category => None,
            EntityKind::MenuItem => {
                let category_id = payload.category_id.ok_or_else(|| {
                    AppError::with_message(ErrorCode::RequiredField, "category_id is required")
                })?;
                let category = self
                    .store
                    .get_entity(tenant_id, EntityKind::Category, category_id)
                    .await?
                    .ok_or_else(|| not_found(EntityKind::Category, category_id))?;
                if let Some(bound) = category.location_id
                    && location_id != Some(bound)
                {
                    return Err(AppError::invalid_scope(format!(
                        "category {category_id} only exists at location {bound}"
                    ))
                    .into());
                }
                Some(category_id)
            }
        };

        let now = now_millis();
        let entity = CatalogEntity {
            id: snowflake_id(),
            tenant_id: tenant_id.to_string(),
            kind,
            name,
            category_id,
            location_id,
            channel_scope: ChannelScope::from(payload.channel),
            sort_order: payload.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        self.ensure_unique_name(tenant_id, &entity).await?;

        // include wins over exclude
        let (list, state) = if !payload.include_location_ids.is_empty() {
            (&payload.include_location_ids, ScopeState::Overlay { visible: true })
        } else {
            (&payload.exclude_location_ids, ScopeState::Tombstone)
        };
        let seeded = if entity.is_global() && !list.is_empty() {
            self.require_locations(tenant_id, list).await?
        } else {
            if !list.is_empty() {
                tracing::debug!(
                    entity_kind = %kind,
                    "Location lists ignored for a location-bound entity"
                );
            }
            Vec::new()
        };

        self.store.insert_entity(&entity).await?;

        let writes = fan_out(&entity, &seeded, entity.channel_scope, state);
        if state == (ScopeState::Overlay { visible: true }) && !writes.is_empty() {
            tracing::debug!(
                entity_id = entity.id,
                count = writes.len(),
                "Include-list overlays written (no effect against baseline)"
            );
        }
        let written = self.apply_all_writes(tenant_id, &writes).await?;

        tracing::info!(
            tenant_id,
            entity_id = entity.id,
            entity_kind = %kind,
            location_id = ?entity.location_id,
            channel_scope = %entity.channel_scope,
            "Catalog entity created"
        );
        self.audit(
            caller,
            AuditAction::EntityCreated,
            &entity,
            json!({
                "before": null,
                "after": entity,
                "scope": {
                    "include_location_ids": payload.include_location_ids,
                    "exclude_location_ids": payload.exclude_location_ids,
                },
                "affected_count": written,
            }),
        );
        Ok(entity)
    }
}
