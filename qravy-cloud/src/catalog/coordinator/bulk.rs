//! Bulk visibility toggle
//!
//! Not transactional as a whole: every `(entity, location, channel)` key is
//! an independent idempotent write, and a failed key only lowers
//! `modified_count`.

use serde_json::json;
use shared::models::{
    BulkVisibilityRequest, BulkVisibilityResult, CatalogEntity, Channel, EntityKind, ScopeState,
};
use shared::visibility::OverlayIndex;

use super::OverlayWrite;
use crate::audit::AuditAction;
use crate::auth::CallerIdentity;
use crate::catalog::CatalogService;
use crate::error::ServiceResult;

/// Target state of one key
///
/// - `visible=true` without `hard_exclude=true` reverts to baseline
/// - `hard_exclude=true` writes a tombstone
/// - `visible=false` writes a soft hide; an existing tombstone is kept
///   unless `hard_exclude=false` explicitly downgrades it
pub fn target_state(current: ScopeState, visible: bool, hard_exclude: Option<bool>) -> ScopeState {
    match (visible, hard_exclude) {
        (_, Some(true)) => ScopeState::Tombstone,
        (true, _) => ScopeState::Baseline,
        (false, None) if current.is_tombstone() => ScopeState::Tombstone,
        (false, _) => ScopeState::Overlay { visible: false },
    }
}

/// Keys a request touches for one entity
///
/// Location-bound entities only ever touch their own location; channels are
/// limited to the entity's ceiling.
fn scope_keys(
    entity: &CatalogEntity,
    location_id: Option<i64>,
    channel: Option<Channel>,
    tenant_locations: &[i64],
) -> Vec<(i64, Channel)> {
    let locations: Vec<i64> = match (entity.location_id, location_id) {
        (Some(bound), Some(requested)) if bound != requested => Vec::new(),
        (Some(bound), _) => vec![bound],
        (None, Some(requested)) => vec![requested],
        (None, None) => tenant_locations.to_vec(),
    };
    let channels: Vec<Channel> = match channel {
        Some(c) if entity.permits(c) => vec![c],
        Some(_) => Vec::new(),
        None => entity.channel_scope.channels(),
    };
    locations
        .iter()
        .flat_map(|l| channels.iter().map(move |c| (*l, *c)))
        .collect()
}

impl CatalogService {
    /// `bulkSetVisibility(ids, visible, location?, channel?, hard_exclude?)`
    pub async fn bulk_set_visibility(
        &self,
        caller: &CallerIdentity,
        kind: EntityKind,
        req: BulkVisibilityRequest,
    ) -> ServiceResult<BulkVisibilityResult> {
        caller.require_write()?;
        let tenant_id = caller.tenant_id.as_str();

        let location_id = caller.scoped_location(req.location_id)?;
        if let Some(id) = location_id {
            self.require_location(tenant_id, id).await?;
        }
        let tenant_locations = match location_id {
            Some(_) => Vec::new(),
            None => self.tenant_location_ids(tenant_id).await?,
        };

        let entities = self.store.get_entities(tenant_id, kind, &req.ids).await?;

        // Plan: only keys whose state actually changes are written
        let mut plans: Vec<(&CatalogEntity, Vec<(ScopeState, OverlayWrite)>)> = Vec::new();
        for entity in &entities {
            let index =
                OverlayIndex::from_records(&self.store.entity_overlays(tenant_id, entity.id).await?);
            let changes = scope_keys(entity, location_id, req.channel, &tenant_locations)
                .into_iter()
                .filter_map(|(l, c)| {
                    let current = index.state(entity.id, l, c);
                    let next = target_state(current, req.visible, req.hard_exclude);
                    (next != current).then(|| (current, OverlayWrite::new(entity, l, c, next)))
                })
                .collect();
            plans.push((entity, changes));
        }

        let writes: Vec<OverlayWrite> = plans
            .iter()
            .flat_map(|(_, changes)| changes.iter().map(|(_, w)| *w))
            .collect();
        let mut results = self.apply_writes(tenant_id, &writes).await.into_iter();

        let mut modified_count = 0u64;
        let mut failed_keys = 0usize;
        for (entity, changes) in &plans {
            let mut failed = Vec::new();
            for (_, write) in changes {
                if let Some(Err(e)) = results.next() {
                    tracing::error!(
                        entity_id = entity.id,
                        location_id = write.location_id,
                        channel = %write.channel,
                        "Visibility write failed after retry: {e}"
                    );
                    failed.push(json!({ "location_id": write.location_id, "channel": write.channel }));
                }
            }
            failed_keys += failed.len();
            if changes.is_empty() {
                continue;
            }
            if failed.is_empty() {
                modified_count += 1;
            }
            self.audit(
                caller,
                AuditAction::VisibilityChanged,
                entity,
                json!({
                    "before": changes.iter().map(|(before, w)| json!({
                        "location_id": w.location_id, "channel": w.channel, "state": before,
                    })).collect::<Vec<_>>(),
                    "after": changes.iter().map(|(_, w)| json!({
                        "location_id": w.location_id, "channel": w.channel, "state": w.state,
                    })).collect::<Vec<_>>(),
                    "scope": {
                        "location_id": location_id,
                        "channel": req.channel,
                        "visible": req.visible,
                        "hard_exclude": req.hard_exclude,
                    },
                    "failed": failed,
                    "affected_count": changes.len() - failed.len(),
                }),
            );
        }

        tracing::info!(
            tenant_id,
            entity_kind = %kind,
            requested = req.ids.len(),
            matched = entities.len(),
            modified = modified_count,
            writes = writes.len(),
            failed_keys,
            "Bulk visibility applied"
        );

        Ok(BulkVisibilityResult {
            matched_count: entities.len() as u64,
            modified_count,
            items: entities,
        })
    }
}
