//! Baseline-plus-overlay resolution
//!
//! Two deliberately different readings of "visible":
//!
//! - **Branch view** (`LocationFilter::At`): local truth. The entity must be
//!   reachable at that location and resolve to included there.
//! - **Global view** (`LocationFilter::All`): existential truth. The entity is
//!   listed if it resolves to included in at least one reachable
//!   `(location, channel)` pair, so one branch opting out never hides it
//!   from the tenant-wide list.
//!
//! When the request names no channel, every channel the entity's ceiling
//! permits is tried and one included channel is enough.

use crate::models::{CatalogEntity, Channel, LocationFilter, RequestScope};

use super::index::OverlayIndex;

/// Resolution of one `(entity, location, channel)` cell
///
/// Applies reachability, the channel ceiling, then
/// `tombstone > explicit overlay value > baseline(true)`.
pub fn included_at(
    entity: &CatalogEntity,
    location_id: i64,
    channel: Channel,
    index: &OverlayIndex,
) -> bool {
    if !entity.reachable_at(location_id) || !entity.permits(channel) {
        return false;
    }
    index
        .state(entity.id, location_id, channel)
        .resolves_visible()
}

/// Channels a request checks for an entity (request channel ∩ ceiling)
fn candidate_channels(entity: &CatalogEntity, channel: Option<Channel>) -> Vec<Channel> {
    match channel {
        Some(c) if entity.permits(c) => vec![c],
        Some(_) => Vec::new(),
        None => entity.channel_scope.channels(),
    }
}

/// Locations an entity can be reached at, given the tenant's locations
fn reachable_locations(entity: &CatalogEntity, tenant_locations: &[i64]) -> Vec<i64> {
    match entity.location_id {
        Some(bound) => vec![bound],
        None => tenant_locations.to_vec(),
    }
}

/// Whether the entity is effectively visible for the request
///
/// `tenant_locations` is only consulted for the global view. A global
/// entity in a tenant with no registered locations falls back to its
/// baseline (visible wherever its ceiling allows).
pub fn is_visible(
    entity: &CatalogEntity,
    scope: &RequestScope,
    index: &OverlayIndex,
    tenant_locations: &[i64],
) -> bool {
    let channels = candidate_channels(entity, scope.channel);
    if channels.is_empty() {
        return false;
    }

    match scope.location {
        LocationFilter::At(location_id) => channels
            .iter()
            .any(|c| included_at(entity, location_id, *c, index)),
        LocationFilter::All => {
            let locations = reachable_locations(entity, tenant_locations);
            if locations.is_empty() {
                return true;
            }
            locations.iter().any(|location_id| {
                channels
                    .iter()
                    .any(|c| included_at(entity, *location_id, *c, index))
            })
        }
    }
}

/// Effective set for a request, keeping the input order
pub fn resolve(
    entities: Vec<CatalogEntity>,
    scope: &RequestScope,
    index: &OverlayIndex,
    tenant_locations: &[i64],
) -> Vec<CatalogEntity> {
    entities
        .into_iter()
        .filter(|e| is_visible(e, scope, index, tenant_locations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelScope, EntityKind, ScopeState};

    const L1: i64 = 1;
    const L2: i64 = 2;
    const LOCATIONS: [i64; 2] = [L1, L2];

    fn entity(id: i64, location_id: Option<i64>, channel_scope: ChannelScope) -> CatalogEntity {
        CatalogEntity {
            id,
            tenant_id: "t1".into(),
            kind: EntityKind::Category,
            name: format!("entity-{id}"),
            category_id: None,
            location_id,
            channel_scope,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn scope(location_id: Option<i64>, channel: Option<Channel>) -> RequestScope {
        RequestScope::new(location_id, channel)
    }

    #[test]
    fn test_no_overlay_resolves_to_baseline_everywhere() {
        let e = entity(1, None, ChannelScope::All);
        let index = OverlayIndex::new();
        for location in [None, Some(L1), Some(L2)] {
            for channel in [None, Some(Channel::DineIn), Some(Channel::Online)] {
                assert!(is_visible(&e, &scope(location, channel), &index, &LOCATIONS));
            }
        }
    }

    #[test]
    fn test_tombstone_always_excludes() {
        let e = entity(1, None, ChannelScope::All);
        let mut index = OverlayIndex::new();
        index.insert(1, L1, Channel::Online, ScopeState::Tombstone);

        assert!(!included_at(&e, L1, Channel::Online, &index));
        assert!(!is_visible(&e, &scope(Some(L1), Some(Channel::Online)), &index, &LOCATIONS));
        // other channel at the same location is untouched
        assert!(is_visible(&e, &scope(Some(L1), None), &index, &LOCATIONS));
    }

    #[test]
    fn test_soft_hide_is_local() {
        let e = entity(1, None, ChannelScope::All);
        let mut index = OverlayIndex::new();
        index.insert(1, L1, Channel::DineIn, ScopeState::Overlay { visible: false });
        index.insert(1, L1, Channel::Online, ScopeState::Overlay { visible: false });

        assert!(!is_visible(&e, &scope(Some(L1), None), &index, &LOCATIONS));
        assert!(is_visible(&e, &scope(Some(L2), None), &index, &LOCATIONS));
        assert!(is_visible(&e, &scope(None, None), &index, &LOCATIONS));
    }

    #[test]
    fn test_channel_ceiling_cannot_be_overridden() {
        let e = entity(1, None, ChannelScope::Only(Channel::DineIn));
        let mut index = OverlayIndex::new();
        index.insert(1, L1, Channel::Online, ScopeState::Overlay { visible: true });

        assert!(!is_visible(&e, &scope(Some(L1), Some(Channel::Online)), &index, &LOCATIONS));
        assert!(!is_visible(&e, &scope(None, Some(Channel::Online)), &index, &LOCATIONS));
        assert!(is_visible(&e, &scope(Some(L1), Some(Channel::DineIn)), &index, &LOCATIONS));
    }

    #[test]
    fn test_location_bound_only_visible_at_home() {
        let e = entity(1, Some(L1), ChannelScope::All);
        let index = OverlayIndex::new();

        assert!(is_visible(&e, &scope(Some(L1), None), &index, &LOCATIONS));
        assert!(!is_visible(&e, &scope(Some(L2), None), &index, &LOCATIONS));
        assert!(is_visible(&e, &scope(None, None), &index, &LOCATIONS));
    }

    #[test]
    fn test_global_view_is_existential() {
        let e = entity(1, None, ChannelScope::All);
        let mut index = OverlayIndex::new();
        index.insert(1, L1, Channel::DineIn, ScopeState::Tombstone);
        index.insert(1, L1, Channel::Online, ScopeState::Tombstone);
        index.insert(1, L2, Channel::DineIn, ScopeState::Overlay { visible: false });

        // L2/online still open
        assert!(is_visible(&e, &scope(None, None), &index, &LOCATIONS));
        assert!(!is_visible(&e, &scope(None, Some(Channel::DineIn)), &index, &LOCATIONS));

        index.insert(1, L2, Channel::DineIn, ScopeState::Tombstone);
        index.insert(1, L2, Channel::Online, ScopeState::Tombstone);
        assert!(!is_visible(&e, &scope(None, None), &index, &LOCATIONS));
    }

    #[test]
    fn test_global_entity_without_locations_uses_baseline() {
        let e = entity(1, None, ChannelScope::Only(Channel::Online));
        let index = OverlayIndex::new();
        assert!(is_visible(&e, &scope(None, None), &index, &[]));
        assert!(!is_visible(&e, &scope(None, Some(Channel::DineIn)), &index, &[]));
    }

    #[test]
    fn test_overlays_on_unknown_locations_are_ignored_in_global_view() {
        let e = entity(1, None, ChannelScope::All);
        let mut index = OverlayIndex::new();
        for location in LOCATIONS {
            for channel in Channel::ALL {
                index.insert(1, location, channel, ScopeState::Tombstone);
            }
        }
        index.insert(1, 99, Channel::Online, ScopeState::Overlay { visible: true });
        assert!(!is_visible(&e, &scope(None, None), &index, &LOCATIONS));
    }

    #[test]
    fn test_resolve_keeps_order() {
        let entities = vec![
            entity(3, None, ChannelScope::All),
            entity(1, Some(L2), ChannelScope::All),
            entity(2, None, ChannelScope::All),
        ];
        let mut index = OverlayIndex::new();
        index.insert(2, L1, Channel::DineIn, ScopeState::Overlay { visible: false });

        let ids: Vec<i64> = resolve(entities, &scope(Some(L1), Some(Channel::DineIn)), &index, &LOCATIONS)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![3]);
    }
}
