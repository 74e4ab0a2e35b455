//! Mutation Coordinator
//!
//! Each operation validates everything (caller, entity, locations, scope,
//! name conflicts) before its first write, then applies the minimal set of
//! per-key overlay writes. Writes to distinct keys run concurrently; each
//! failed key is retried once.

mod bulk;
mod create;
mod delete;
mod update;

pub use delete::{DeleteCase, DeleteEffect};

use futures::future::join_all;
use shared::models::{CatalogEntity, Channel, ChannelScope, EntityKind, OverlayKey, OverlayRecord, ScopeState};
use shared::util::{normalize_name, now_millis};

use super::{CatalogService, name_exists};
use crate::BoxError;
use crate::error::ServiceResult;

/// Target state for one overlay key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayWrite {
    pub entity_id: i64,
    pub kind: EntityKind,
    pub location_id: i64,
    pub channel: Channel,
    /// `Baseline` clears the key
    pub state: ScopeState,
}

impl OverlayWrite {
    pub fn new(entity: &CatalogEntity, location_id: i64, channel: Channel, state: ScopeState) -> Self {
        Self {
            entity_id: entity.id,
            kind: entity.kind,
            location_id,
            channel,
            state,
        }
    }
}

impl CatalogService {
    async fn write_overlay(&self, tenant_id: &str, write: &OverlayWrite) -> Result<(), BoxError> {
        let key = OverlayKey::new(tenant_id, write.entity_id, write.location_id, write.channel);
        if write.state.is_baseline() {
            self.store.clear_overlay(&key).await?;
        } else {
            self.store
                .upsert_overlay(&OverlayRecord {
                    key,
                    kind: write.kind,
                    state: write.state,
                    updated_at: now_millis(),
                })
                .await?;
        }
        Ok(())
    }

    async fn write_with_retry(&self, tenant_id: &str, write: &OverlayWrite) -> Result<(), BoxError> {
        match self.write_overlay(tenant_id, write).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    entity_id = write.entity_id,
                    location_id = write.location_id,
                    channel = %write.channel,
                    "Overlay write failed, retrying once: {e}"
                );
                self.write_overlay(tenant_id, write).await
            }
        }
    }

    /// Apply independent per-key writes concurrently; results keep input order
    pub(crate) async fn apply_writes(
        &self,
        tenant_id: &str,
        writes: &[OverlayWrite],
    ) -> Vec<Result<(), BoxError>> {
        join_all(writes.iter().map(|w| self.write_with_retry(tenant_id, w))).await
    }

    /// Apply writes that must all land for the operation to succeed
    pub(crate) async fn apply_all_writes(
        &self,
        tenant_id: &str,
        writes: &[OverlayWrite],
    ) -> ServiceResult<u64> {
        let mut failed = 0usize;
        let mut last_error = None;
        for result in self.apply_writes(tenant_id, writes).await {
            if let Err(e) = result {
                failed += 1;
                last_error = Some(e);
            }
        }
        match last_error {
            None => Ok(writes.len() as u64),
            Some(e) => {
                tracing::error!(
                    tenant_id,
                    failed,
                    total = writes.len(),
                    "Overlay writes failed after retry"
                );
                Err(e.into())
            }
        }
    }

    /// Reject a name already used in an overlapping scope
    ///
    /// Same kind, same base location, overlapping channel scope; menu items
    /// must also share the category.
    pub(crate) async fn ensure_unique_name(
        &self,
        tenant_id: &str,
        candidate: &CatalogEntity,
    ) -> ServiceResult<()> {
        let wanted = normalize_name(&candidate.name);
        let clashes = self
            .store
            .find_by_name(tenant_id, candidate.kind, &candidate.name)
            .await?
            .into_iter()
            .filter(|other| other.id != candidate.id)
            .filter(|other| normalize_name(&other.name) == wanted)
            .filter(|other| other.location_id == candidate.location_id)
            .filter(|other| other.category_id == candidate.category_id)
            .any(|other| other.channel_scope.overlaps(candidate.channel_scope));
        if clashes {
            return Err(name_exists(candidate.kind, candidate.name.trim()).into());
        }
        Ok(())
    }
}

/// Every `(location, channel)` pair for a set of locations under a ceiling
pub(crate) fn fan_out(
    entity: &CatalogEntity,
    location_ids: &[i64],
    scope: ChannelScope,
    state: ScopeState,
) -> Vec<OverlayWrite> {
    location_ids
        .iter()
        .flat_map(|location_id| {
            scope
                .channels()
                .into_iter()
                .map(move |channel| OverlayWrite::new(entity, *location_id, channel, state))
        })
        .collect()
}

pub(crate) fn validated_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(shared::error::AppError::with_message(
            shared::error::ErrorCode::RequiredField,
            "name must not be empty",
        )
        .into());
    }
    Ok(trimmed.to_string())
}
