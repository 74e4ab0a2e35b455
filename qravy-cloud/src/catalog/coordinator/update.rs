//! Update: rename / rescope / per-location include or exclude

use serde_json::json;
use shared::error::AppError;
use shared::models::{CatalogEntity, EntityKind, EntityUpdate, ScopeState};
use shared::util::now_millis;

use super::{OverlayWrite, fan_out, validated_name};
use crate::audit::AuditAction;
use crate::auth::CallerIdentity;
use crate::catalog::CatalogService;
use crate::error::ServiceResult;

impl CatalogService {
    /// `update(id, name?, channel?|'both', include?, exclude?, hard_exclude?)`
    ///
    /// Narrowing the channel scope clears overlays of the removed channel.
    /// On global entities an include-list writes `visible=true` overlays and
    /// an exclude-list writes tombstones, or soft hides when
    /// `hard_exclude=false`. Include wins when both lists are given.
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        kind: EntityKind,
        id: i64,
        payload: EntityUpdate,
    ) -> ServiceResult<CatalogEntity> {
        caller.require_write()?;
        let tenant_id = caller.tenant_id.as_str();
        let before = self.load_entity(tenant_id, kind, id).await?;

        if let Some(own) = caller.location_id {
            match before.location_id {
                None => {
                    return Err(AppError::forbidden(
                        "Branch sessions cannot modify tenant-wide entities",
                    )
                    .into());
                }
                Some(bound) if bound != own => {
                    return Err(AppError::location_forbidden(bound).into());
                }
                Some(_) => {}
            }
        }

        let mut after = before.clone();
        if let Some(name) = &payload.name {
            after.name = validated_name(name)?;
        }
        if let Some(scope) = payload.channel {
            after.channel_scope = scope;
        }
        if let Some(sort_order) = payload.sort_order {
            after.sort_order = sort_order;
        }
        if after.name != before.name || after.channel_scope != before.channel_scope {
            self.ensure_unique_name(tenant_id, &after).await?;
        }

        let include = payload.include_location_ids.clone().unwrap_or_default();
        let exclude = payload.exclude_location_ids.clone().unwrap_or_default();
        let (list, state) = if !include.is_empty() {
            (include, ScopeState::Overlay { visible: true })
        } else if payload.hard_exclude == Some(false) {
            (exclude, ScopeState::Overlay { visible: false })
        } else {
            (exclude, ScopeState::Tombstone)
        };
        let targets = if after.is_global() && !list.is_empty() {
            self.require_locations(tenant_id, &list).await?
        } else {
            Vec::new()
        };

        // validated; start writing
        after.updated_at = now_millis();
        self.store.update_entity(&after).await?;

        let mut affected = 0u64;
        let removed = before.channel_scope.removed_by(after.channel_scope);
        for channel in &removed {
            affected += self
                .store
                .clear_channel_overlays(tenant_id, id, *channel)
                .await?;
        }
        if before.channel_scope.widened_by(after.channel_scope) {
            tracing::debug!(entity_id = id, "Channel scope widened");
        }

        let writes: Vec<OverlayWrite> = fan_out(&after, &targets, after.channel_scope, state);
        affected += self.apply_all_writes(tenant_id, &writes).await?;

        tracing::info!(
            tenant_id,
            entity_id = id,
            entity_kind = %kind,
            renamed = after.name != before.name,
            cleared_channels = removed.len(),
            overlay_writes = writes.len(),
            "Catalog entity updated"
        );
        self.audit(
            caller,
            AuditAction::EntityUpdated,
            &after,
            json!({
                "before": before,
                "after": after,
                "scope": {
                    "include_location_ids": payload.include_location_ids,
                    "exclude_location_ids": payload.exclude_location_ids,
                    "hard_exclude": payload.hard_exclude,
                    "removed_channels": removed,
                },
                "affected_count": affected,
            }),
        );
        Ok(after)
    }
}
