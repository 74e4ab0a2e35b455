//! Mutation → cache plan
//!
//! Every mutation is translated into per-cell results, computed with the
//! same precedence rule the server resolves with, plus the views that can
//! no longer be patched safely. Nothing here touches the cache.

use shared::models::{
    BulkVisibilityRequest, CatalogEntity, Channel, ChannelScope, DeleteQuery, EntityCreate,
    EntityKind, EntityUpdate, ScopeState,
};
use shared::visibility::{OverlayIndex, included_at};

use super::partition::{ChannelKey, LocationKey, PartitionKey};

/// Session the cache belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSession {
    pub tenant_id: String,
    /// Set for branch sessions
    pub location_id: Option<i64>,
    /// Every location of the tenant (global fan-out)
    pub locations: Vec<i64>,
}

impl CacheSession {
    pub fn central(tenant_id: impl Into<String>, locations: Vec<i64>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            location_id: None,
            locations,
        }
    }

    pub fn branch(tenant_id: impl Into<String>, location_id: i64, locations: Vec<i64>) -> Self {
        Self {
            location_id: Some(location_id),
            ..Self::central(tenant_id, locations)
        }
    }

    /// Locations where an entity can show up
    pub(crate) fn reachable(&self, entity: &CatalogEntity) -> Vec<i64> {
        match entity.location_id {
            Some(bound) => vec![bound],
            None => self.locations.clone(),
        }
    }
}

/// Catalog mutation as seen by the cache
#[derive(Debug, Clone)]
pub enum CatalogMutation {
    /// Bulk visibility toggle (applied optimistically)
    SetVisibility {
        kind: EntityKind,
        request: BulkVisibilityRequest,
    },
    /// Scoped delete (applied optimistically)
    Delete {
        kind: EntityKind,
        id: i64,
        query: DeleteQuery,
    },
    /// Entity returned by a successful create
    Created {
        entity: CatalogEntity,
        payload: EntityCreate,
    },
    /// Entity returned by a successful update
    Updated {
        entity: CatalogEntity,
        payload: EntityUpdate,
    },
}

impl CatalogMutation {
    pub fn kind(&self) -> EntityKind {
        match self {
            CatalogMutation::SetVisibility { kind, .. } | CatalogMutation::Delete { kind, .. } => *kind,
            CatalogMutation::Created { entity, .. } | CatalogMutation::Updated { entity, .. } => {
                entity.kind
            }
        }
    }
}

/// Result of one `(entity, location, channel)` cell
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CellUpdate {
    pub entity: CatalogEntity,
    pub location_id: i64,
    pub channel: Channel,
    pub visible: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SyncPlan {
    pub cells: Vec<CellUpdate>,
    /// Hard-deleted entities
    pub removed: Vec<(EntityKind, i64)>,
    /// Rows rewritten in place (rename, narrowed channel scope)
    pub replaced: Vec<CatalogEntity>,
    /// Kinds whose partitions and indicators must all be refetched
    pub invalidate_kinds: Vec<EntityKind>,
    /// Kinds whose indicators must be refetched
    pub stale_indicators: Vec<EntityKind>,
    /// Individual partitions that must be refetched
    pub invalidate: Vec<PartitionKey>,
}

impl SyncPlan {
    fn cell(&mut self, entity: &CatalogEntity, location_id: i64, channel: Channel, state: ScopeState) {
        self.cells.push(CellUpdate {
            entity: entity.clone(),
            location_id,
            channel,
            visible: cell_result(entity, location_id, channel, state),
        });
    }

    fn invalidate_kind(&mut self, kind: EntityKind) {
        if !self.invalidate_kinds.contains(&kind) {
            self.invalidate_kinds.push(kind);
        }
    }
}

/// Visibility of one cell once `state` is stored for it
pub(crate) fn cell_result(entity: &CatalogEntity, location_id: i64, channel: Channel, state: ScopeState) -> bool {
    let mut index = OverlayIndex::new();
    index.insert(entity.id, location_id, channel, state);
    included_at(entity, location_id, channel, &index)
}

/// State a bulk toggle leaves behind
///
/// A kept tombstone and a soft hide resolve alike, so the current state is
/// not needed here.
fn requested_state(visible: bool, hard_exclude: Option<bool>) -> ScopeState {
    match (visible, hard_exclude) {
        (_, Some(true)) => ScopeState::Tombstone,
        (true, _) => ScopeState::Baseline,
        (false, _) => ScopeState::Overlay { visible: false },
    }
}

fn scope_cells(
    entity: &CatalogEntity,
    location_id: Option<i64>,
    channel: Option<Channel>,
    session: &CacheSession,
) -> Vec<(i64, Channel)> {
    let locations = match (entity.location_id, location_id) {
        (Some(bound), Some(requested)) if bound != requested => Vec::new(),
        (_, Some(requested)) => vec![requested],
        (_, None) => session.reachable(entity),
    };
    let channels = match channel {
        Some(c) if entity.permits(c) => vec![c],
        Some(_) => Vec::new(),
        None => entity.channel_scope.channels(),
    };
    locations
        .iter()
        .flat_map(|l| channels.iter().map(move |c| (*l, *c)))
        .collect()
}

/// Build the plan for one mutation
///
/// `lookup` finds a cached row of the session's tenant.
pub(crate) fn plan(
    mutation: &CatalogMutation,
    session: &CacheSession,
    lookup: impl Fn(EntityKind, i64) -> Option<CatalogEntity>,
) -> SyncPlan {
    let mut plan = SyncPlan::default();
    match mutation {
        CatalogMutation::SetVisibility { kind, request } => {
            plan_visibility(&mut plan, *kind, request, session, &lookup)
        }
        CatalogMutation::Delete { kind, id, query } => {
            plan_delete(&mut plan, *kind, *id, *query, session, &lookup)
        }
        CatalogMutation::Created { entity, payload } => {
            let (list, state) = location_lists(
                &payload.include_location_ids,
                &payload.exclude_location_ids,
                true,
            );
            for location_id in session.reachable(entity) {
                for channel in entity.channel_scope.channels() {
                    let seeded = entity.is_global() && list.contains(&location_id);
                    let cell_state = if seeded { state } else { ScopeState::Baseline };
                    plan.cell(entity, location_id, channel, cell_state);
                }
            }
        }
        CatalogMutation::Updated { entity, payload } => {
            plan_update(&mut plan, entity, payload, session, &lookup)
        }
    }
    plan
}

/// Include wins; an exclude-list hides softly only when `hard` is false
fn location_lists<'a>(include: &'a [i64], exclude: &'a [i64], hard: bool) -> (&'a [i64], ScopeState) {
    if !include.is_empty() {
        (include, ScopeState::Overlay { visible: true })
    } else if hard {
        (exclude, ScopeState::Tombstone)
    } else {
        (exclude, ScopeState::Overlay { visible: false })
    }
}

fn plan_visibility(
    plan: &mut SyncPlan,
    kind: EntityKind,
    request: &BulkVisibilityRequest,
    session: &CacheSession,
    lookup: &impl Fn(EntityKind, i64) -> Option<CatalogEntity>,
) {
    let location_id = request.location_id.or(session.location_id);
    let state = requested_state(request.visible, request.hard_exclude);

    let mut seen = Vec::with_capacity(request.ids.len());
    for id in &request.ids {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);

        let Some(entity) = lookup(kind, *id) else {
            if state.resolves_visible() {
                // row needed to show it anywhere
                plan.invalidate_kind(kind);
            } else if !plan.stale_indicators.contains(&kind) {
                plan.stale_indicators.push(kind);
            }
            continue;
        };
        for (l, c) in scope_cells(&entity, location_id, request.channel, session) {
            plan.cell(&entity, l, c, state);
        }
    }
}

fn plan_delete(
    plan: &mut SyncPlan,
    kind: EntityKind,
    id: i64,
    query: DeleteQuery,
    session: &CacheSession,
    lookup: &impl Fn(EntityKind, i64) -> Option<CatalogEntity>,
) {
    let location_id = query.location_id.or(session.location_id);
    if kind == EntityKind::Category {
        // items follow their category through the same table
        plan.invalidate_kind(EntityKind::MenuItem);
    }

    let entity = match (lookup(kind, id), location_id, query.channel) {
        (_, None, None) => {
            plan.removed.push((kind, id));
            return;
        }
        (Some(entity), _, _) => entity,
        (None, _, _) => {
            plan.invalidate_kind(kind);
            return;
        }
    };

    match (location_id, query.channel) {
        (None, None) => plan.removed.push((kind, id)),

        (None, Some(channel)) => match entity.channel_scope {
            ChannelScope::Only(_) => plan.removed.push((kind, id)),
            ChannelScope::All => {
                let narrowed = CatalogEntity {
                    channel_scope: ChannelScope::Only(channel.other()),
                    ..entity
                };
                for location_id in session.reachable(&narrowed) {
                    plan.cell(&narrowed, location_id, channel, ScopeState::Tombstone);
                }
                plan.replaced.push(narrowed);
            }
        },

        (Some(location_id), None) => {
            if entity.is_global() {
                for channel in entity.channel_scope.channels() {
                    plan.cell(&entity, location_id, channel, ScopeState::Tombstone);
                }
            } else {
                plan.removed.push((kind, id));
            }
        }

        (Some(location_id), Some(channel)) => {
            if entity.is_global() {
                plan.cell(&entity, location_id, channel, ScopeState::Tombstone);
            } else if !entity.permits(channel.other()) {
                plan.removed.push((kind, id));
            } else {
                // server either flips the channel off or deletes the record
                plan.cell(&entity, location_id, channel, ScopeState::Overlay { visible: false });
                let other = channel.other();
                let tenant = session.tenant_id.as_str();
                plan.invalidate.extend([
                    PartitionKey::cell(tenant, kind, location_id, other),
                    PartitionKey::new(tenant, kind, LocationKey::At(location_id), ChannelKey::All),
                    PartitionKey::new(tenant, kind, LocationKey::All, ChannelKey::Only(other)),
                    PartitionKey::new(tenant, kind, LocationKey::All, ChannelKey::All),
                ]);
                if !plan.stale_indicators.contains(&kind) {
                    plan.stale_indicators.push(kind);
                }
            }
        }
    }
}

fn plan_update(
    plan: &mut SyncPlan,
    after: &CatalogEntity,
    payload: &EntityUpdate,
    session: &CacheSession,
    lookup: &impl Fn(EntityKind, i64) -> Option<CatalogEntity>,
) {
    let Some(before) = lookup(after.kind, after.id) else {
        plan.invalidate_kind(after.kind);
        return;
    };
    if before.channel_scope.widened_by(after.channel_scope) {
        plan.invalidate_kind(after.kind);
        return;
    }

    plan.replaced.push(after.clone());
    for channel in before.channel_scope.removed_by(after.channel_scope) {
        for location_id in session.reachable(after) {
            plan.cell(after, location_id, channel, ScopeState::Baseline);
        }
    }

    if after.is_global() {
        let include = payload.include_location_ids.as_deref().unwrap_or_default();
        let exclude = payload.exclude_location_ids.as_deref().unwrap_or_default();
        let (list, state) = location_lists(include, exclude, payload.hard_exclude != Some(false));
        for location_id in list {
            for channel in after.channel_scope.channels() {
                plan.cell(after, *location_id, channel, state);
            }
        }
    }
}
