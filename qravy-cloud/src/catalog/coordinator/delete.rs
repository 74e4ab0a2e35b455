//! Scoped delete
//!
//! The request shape `(location?, channel?)` selects one of four cases.
//! Each case maps an entity to a [`DeleteEffect`]; deleting a category
//! applies the same case to every item under it.

use serde::Serialize;
use serde_json::json;
use shared::error::AppError;
use shared::models::{
    CatalogEntity, Channel, ChannelScope, DeleteQuery, DeleteResult, EntityKind, LocationFilter,
    ScopeState,
};
use shared::util::now_millis;
use shared::visibility::{OverlayIndex, included_at};

use super::OverlayWrite;
use crate::audit::AuditAction;
use crate::auth::CallerIdentity;
use crate::catalog::CatalogService;
use crate::error::ServiceResult;

/// Delete request shape, keyed by `(location_given, channel_given)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "case", rename_all = "snake_case")]
pub enum DeleteCase {
    /// `(None, None)`
    Global,
    /// `(None, Some)`
    ChannelOnly { channel: Channel },
    /// `(Some, None)`
    LocationOnly { location_id: i64 },
    /// `(Some, Some)`
    LocationChannel { location_id: i64, channel: Channel },
}

impl DeleteCase {
    pub fn from_scope(location_id: Option<i64>, channel: Option<Channel>) -> Self {
        match (location_id, channel) {
            (None, None) => DeleteCase::Global,
            (None, Some(channel)) => DeleteCase::ChannelOnly { channel },
            (Some(location_id), None) => DeleteCase::LocationOnly { location_id },
            (Some(location_id), Some(channel)) => DeleteCase::LocationChannel {
                location_id,
                channel,
            },
        }
    }

    /// Whether the entity exists inside the requested scope at all
    pub fn covers(&self, entity: &CatalogEntity) -> bool {
        match *self {
            DeleteCase::Global => true,
            DeleteCase::ChannelOnly { channel } => entity.permits(channel),
            DeleteCase::LocationOnly { location_id } => entity.reachable_at(location_id),
            DeleteCase::LocationChannel {
                location_id,
                channel,
            } => entity.reachable_at(location_id) && entity.permits(channel),
        }
    }

    /// The decision table
    ///
    /// `index` must hold the entity's overlays at the requested location
    /// (only consulted for the location+channel case).
    pub fn effect(&self, entity: &CatalogEntity, index: &OverlayIndex) -> DeleteEffect {
        if !self.covers(entity) {
            return DeleteEffect::Untouched;
        }
        match *self {
            DeleteCase::Global => DeleteEffect::HardDelete,

            DeleteCase::ChannelOnly { channel } => match entity.channel_scope {
                ChannelScope::Only(_) => DeleteEffect::HardDelete,
                ChannelScope::All => DeleteEffect::Narrow {
                    remaining: ChannelScope::Only(channel.other()),
                    removed: channel,
                },
            },

            DeleteCase::LocationOnly { location_id } => {
                if entity.is_global() {
                    DeleteEffect::Tombstone {
                        location_id,
                        channels: entity.channel_scope.channels(),
                    }
                } else {
                    DeleteEffect::HardDelete
                }
            }

            DeleteCase::LocationChannel {
                location_id,
                channel,
            } => {
                if entity.is_global() {
                    return DeleteEffect::Tombstone {
                        location_id,
                        channels: vec![channel],
                    };
                }
                let other = channel.other();
                if !(entity.permits(other) && included_at(entity, location_id, other, index)) {
                    return DeleteEffect::HardDelete;
                }
                // a hard exclusion on the deleted channel stays hard
                if index.state(entity.id, location_id, channel).is_tombstone() {
                    DeleteEffect::Tombstone {
                        location_id,
                        channels: vec![channel],
                    }
                } else {
                    DeleteEffect::SoftOff {
                        location_id,
                        channel,
                    }
                }
            }
        }
    }
}

/// What a delete does to one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DeleteEffect {
    /// Outside the requested scope
    Untouched,
    /// Remove the baseline document and all its overlays
    HardDelete,
    /// Keep the entity on the remaining channel; drop overlays of the removed one
    Narrow {
        remaining: ChannelScope,
        removed: Channel,
    },
    /// Tombstone these keys (a global entity still exists elsewhere, or the
    /// channel was already hard-excluded)
    Tombstone {
        location_id: i64,
        channels: Vec<Channel>,
    },
    /// Location-bound entity still live on the other channel: flip this one off
    SoftOff { location_id: i64, channel: Channel },
}

impl DeleteEffect {
    pub fn changes(&self) -> bool {
        !matches!(self, DeleteEffect::Untouched)
    }

    fn overlay_writes(&self, entity: &CatalogEntity) -> Vec<OverlayWrite> {
        match self {
            DeleteEffect::Tombstone {
                location_id,
                channels,
            } => channels
                .iter()
                .map(|c| OverlayWrite::new(entity, *location_id, *c, ScopeState::Tombstone))
                .collect(),
            DeleteEffect::SoftOff {
                location_id,
                channel,
            } => vec![OverlayWrite::new(
                entity,
                *location_id,
                *channel,
                ScopeState::Overlay { visible: false },
            )],
            _ => Vec::new(),
        }
    }
}

impl CatalogService {
    /// `delete(id, location?, channel?) → { deleted, affected_count }`
    ///
    /// `affected_count` is the number of dependent menu items the cascade
    /// changed (always 0 for an item).
    pub async fn delete(
        &self,
        caller: &CallerIdentity,
        kind: EntityKind,
        id: i64,
        query: DeleteQuery,
    ) -> ServiceResult<DeleteResult> {
        caller.require_write()?;
        let tenant_id = caller.tenant_id.as_str();
        let entity = self.load_entity(tenant_id, kind, id).await?;

        let location_id = caller.scoped_location(query.location_id)?;
        if let Some(location_id) = location_id {
            self.require_location(tenant_id, location_id).await?;
        }
        let case = DeleteCase::from_scope(location_id, query.channel);
        if !case.covers(&entity) {
            return Err(AppError::invalid_scope(format!(
                "{kind} {id} does not exist in the requested location/channel scope"
            ))
            .with_detail("scope", json!(case))
            .into());
        }

        let primary_index = OverlayIndex::from_records(&self.store.entity_overlays(tenant_id, id).await?);
        let primary_effect = case.effect(&entity, &primary_index);

        // Items follow their category: a hard-deleted category takes all of them
        let mut dependents: Vec<(CatalogEntity, DeleteEffect)> = Vec::new();
        if kind == EntityKind::Category {
            let items = self.store.list_items_in_category(tenant_id, id).await?;
            let item_index = match case {
                DeleteCase::LocationChannel { location_id, .. } => OverlayIndex::from_records(
                    &self
                        .store
                        .list_overlays(tenant_id, EntityKind::MenuItem, LocationFilter::At(location_id))
                        .await?,
                ),
                _ => OverlayIndex::new(),
            };
            for item in items {
                let effect = if primary_effect == DeleteEffect::HardDelete {
                    DeleteEffect::HardDelete
                } else {
                    case.effect(&item, &item_index)
                };
                if effect.changes() {
                    dependents.push((item, effect));
                }
            }
        }

        // validated; start writing (items before their category)
        for (item, effect) in &dependents {
            self.apply_delete_effect(tenant_id, item, effect).await?;
        }
        self.apply_delete_effect(tenant_id, &entity, &primary_effect).await?;

        let affected_count = dependents.len() as u64;
        tracing::info!(
            tenant_id,
            entity_id = id,
            entity_kind = %kind,
            case = ?case,
            effect = ?primary_effect,
            affected_count,
            "Catalog entity deleted"
        );
        self.audit(
            caller,
            AuditAction::EntityDeleted,
            &entity,
            json!({
                "before": entity,
                "after": primary_effect,
                "scope": case,
                "dependents": dependents
                    .iter()
                    .map(|(item, effect)| json!({ "id": item.id, "effect": effect }))
                    .collect::<Vec<_>>(),
                "affected_count": affected_count,
            }),
        );

        Ok(DeleteResult {
            deleted: true,
            affected_count,
        })
    }

    async fn apply_delete_effect(
        &self,
        tenant_id: &str,
        entity: &CatalogEntity,
        effect: &DeleteEffect,
    ) -> ServiceResult<()> {
        match effect {
            DeleteEffect::Untouched => {}
            DeleteEffect::HardDelete => {
                self.store.delete_entity(tenant_id, entity.id).await?;
            }
            DeleteEffect::Narrow { remaining, removed } => {
                let mut narrowed = entity.clone();
                narrowed.channel_scope = *remaining;
                narrowed.updated_at = now_millis();
                self.store.update_entity(&narrowed).await?;
                self.store
                    .clear_channel_overlays(tenant_id, entity.id, *removed)
                    .await?;
            }
            DeleteEffect::Tombstone { .. } | DeleteEffect::SoftOff { .. } => {
                self.apply_all_writes(tenant_id, &effect.overlay_writes(entity))
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L1: i64 = 1;

    fn entity(location_id: Option<i64>, channel_scope: ChannelScope) -> CatalogEntity {
        CatalogEntity {
            id: 10,
            tenant_id: "t1".into(),
            kind: EntityKind::MenuItem,
            name: "Latte".into(),
            category_id: Some(1),
            location_id,
            channel_scope,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_case_table_keys() {
        assert_eq!(DeleteCase::from_scope(None, None), DeleteCase::Global);
        assert_eq!(
            DeleteCase::from_scope(None, Some(Channel::Online)),
            DeleteCase::ChannelOnly {
                channel: Channel::Online
            }
        );
        assert_eq!(
            DeleteCase::from_scope(Some(L1), None),
            DeleteCase::LocationOnly { location_id: L1 }
        );
        assert_eq!(
            DeleteCase::from_scope(Some(L1), Some(Channel::DineIn)),
            DeleteCase::LocationChannel {
                location_id: L1,
                channel: Channel::DineIn
            }
        );
    }

    #[test]
    fn test_global_case() {
        let index = OverlayIndex::new();
        for e in [
            entity(None, ChannelScope::All),
            entity(Some(L1), ChannelScope::Only(Channel::Online)),
        ] {
            assert_eq!(DeleteCase::Global.effect(&e, &index), DeleteEffect::HardDelete);
        }
    }

    #[test]
    fn test_channel_only_case() {
        let index = OverlayIndex::new();
        let case = DeleteCase::ChannelOnly {
            channel: Channel::Online,
        };

        // both channels: narrow to the remaining one (global and bound alike)
        for location_id in [None, Some(L1)] {
            assert_eq!(
                case.effect(&entity(location_id, ChannelScope::All), &index),
                DeleteEffect::Narrow {
                    remaining: ChannelScope::Only(Channel::DineIn),
                    removed: Channel::Online,
                }
            );
        }
        assert_eq!(
            case.effect(&entity(None, ChannelScope::Only(Channel::Online)), &index),
            DeleteEffect::HardDelete
        );
        assert_eq!(
            case.effect(&entity(None, ChannelScope::Only(Channel::DineIn)), &index),
            DeleteEffect::Untouched
        );
    }

    #[test]
    fn test_location_only_case() {
        let index = OverlayIndex::new();
        let case = DeleteCase::LocationOnly { location_id: L1 };

        assert_eq!(
            case.effect(&entity(Some(L1), ChannelScope::All), &index),
            DeleteEffect::HardDelete
        );
        assert_eq!(
            case.effect(&entity(None, ChannelScope::All), &index),
            DeleteEffect::Tombstone {
                location_id: L1,
                channels: vec![Channel::DineIn, Channel::Online],
            }
        );
        assert_eq!(
            case.effect(&entity(None, ChannelScope::Only(Channel::Online)), &index),
            DeleteEffect::Tombstone {
                location_id: L1,
                channels: vec![Channel::Online],
            }
        );
        assert_eq!(
            case.effect(&entity(Some(2), ChannelScope::All), &index),
            DeleteEffect::Untouched
        );
    }

    #[test]
    fn test_location_channel_case() {
        let case = DeleteCase::LocationChannel {
            location_id: L1,
            channel: Channel::Online,
        };
        let mut index = OverlayIndex::new();

        // bound, dine-in still active: flip online off
        let bound = entity(Some(L1), ChannelScope::All);
        assert_eq!(
            case.effect(&bound, &index),
            DeleteEffect::SoftOff {
                location_id: L1,
                channel: Channel::Online,
            }
        );

        // bound, dine-in already hidden: nothing remains
        index.insert(10, L1, Channel::DineIn, ScopeState::Overlay { visible: false });
        assert_eq!(case.effect(&bound, &index), DeleteEffect::HardDelete);

        // bound to online only: nothing remains
        assert_eq!(
            case.effect(&entity(Some(L1), ChannelScope::Only(Channel::Online)), &index),
            DeleteEffect::HardDelete
        );

        // global: exactly one tombstone
        assert_eq!(
            case.effect(&entity(None, ChannelScope::All), &index),
            DeleteEffect::Tombstone {
                location_id: L1,
                channels: vec![Channel::Online],
            }
        );
    }

    #[test]
    fn test_location_channel_keeps_existing_tombstone() {
        let case = DeleteCase::from_scope(Some(L1), Some(Channel::Online));
        let bound = entity(Some(L1), ChannelScope::All);
        let mut index = OverlayIndex::new();
        index.insert(10, L1, Channel::Online, ScopeState::Tombstone);

        let effect = case.effect(&bound, &index);
        assert_eq!(
            effect,
            DeleteEffect::Tombstone {
                location_id: L1,
                channels: vec![Channel::Online],
            }
        );
        let writes = effect.overlay_writes(&bound);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].state, ScopeState::Tombstone);

        // soft hide on the deleted channel is simply flipped off
        index.insert(10, L1, Channel::Online, ScopeState::Overlay { visible: false });
        assert_eq!(
            case.effect(&bound, &index),
            DeleteEffect::SoftOff {
                location_id: L1,
                channel: Channel::Online,
            }
        );
    }
}
