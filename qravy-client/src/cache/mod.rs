//! Client Cache Synchronizer
//!
//! Keeps resolved `list` responses per partition and patches them locally
//! after every mutation instead of refetching.
//!
//! ```text
//! mutation ──► synchronizer::plan ──► cell results (same precedence as server)
//!                                          │
//!                         patch (L, ch) partitions + channel indicators
//!                                          │
//!                 re-derive (L, all) / (all, ch) / (all, all) via aggregate
//!                                          │
//!                    Unknown or ambiguous ──► drop + queue for refetch
//! ```
//!
//! Every change is recorded in the returned [`CachePatch`] so a failed
//! server write can be rolled back to the pre-mutation state.

mod partition;
mod snapshot;
mod synchronizer;

pub use partition::{
    CacheKey, ChannelIndicator, ChannelKey, IndicatorKey, LocationKey, Partition, PartitionKey,
};
pub use snapshot::CachePatch;
pub use synchronizer::{CacheSession, CatalogMutation};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use shared::models::{CatalogEntity, Channel, EntityKind};
use shared::visibility::{Aggregate, aggregate_any, aggregate_channels};

use synchronizer::SyncPlan;

/// Per-cell overrides produced by the mutation being applied
type Overrides = HashMap<(i64, i64, Channel), bool>;

#[derive(Debug, Default)]
pub struct CatalogCache {
    partitions: HashMap<PartitionKey, Partition>,
    indicators: HashMap<IndicatorKey, ChannelIndicator>,
    invalidated: BTreeSet<CacheKey>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh `list` response
    pub fn load_partition(&mut self, key: PartitionKey, rows: Vec<CatalogEntity>) {
        self.invalidated.remove(&CacheKey::Partition(key.clone()));
        self.partitions.insert(key, Partition::new(rows));
    }

    pub fn partition(&self, key: &PartitionKey) -> Option<&Partition> {
        self.partitions.get(key)
    }

    /// Start tracking hidden entities at one `(location, channel)`
    pub fn load_indicator(&mut self, key: IndicatorKey, hidden: impl IntoIterator<Item = i64>) {
        self.invalidated.remove(&CacheKey::Indicator(key.clone()));
        self.indicators.insert(key, ChannelIndicator::new(hidden));
    }

    pub fn indicator(&self, key: &IndicatorKey) -> Option<&ChannelIndicator> {
        self.indicators.get(key)
    }

    /// Any cached row of an entity
    pub fn find_row(&self, tenant_id: &str, kind: EntityKind, id: i64) -> Option<CatalogEntity> {
        self.partitions
            .iter()
            .filter(|(k, _)| k.tenant_id == tenant_id && k.kind == kind)
            .find_map(|(_, p)| p.get(id).cloned())
    }

    /// Drain the keys that were dropped and need a refetch
    pub fn take_invalidated(&mut self) -> Vec<CacheKey> {
        std::mem::take(&mut self.invalidated).into_iter().collect()
    }

    /// Queue a key for refetch without dropping anything
    pub(crate) fn requeue(&mut self, key: CacheKey) {
        self.invalidated.insert(key);
    }

    /// Patch every affected partition for a mutation
    pub fn apply(&mut self, mutation: &CatalogMutation, session: &CacheSession) -> CachePatch {
        let tenant_id = session.tenant_id.as_str();
        let plan = synchronizer::plan(mutation, session, |kind, id| {
            self.find_row(tenant_id, kind, id)
        });
        let mut patch = CachePatch::default();
        self.apply_plan(&plan, session, &mut patch);

        tracing::debug!(
            tenant_id,
            kind = %mutation.kind(),
            cells = plan.cells.len(),
            removed = plan.removed.len(),
            touched = patch.touched(),
            invalidated = patch.invalidated().len(),
            "Cache patch applied"
        );
        patch
    }

    /// Keep an applied patch
    pub fn commit(&mut self, patch: CachePatch) {
        tracing::trace!(touched = patch.touched(), "Cache patch committed");
    }

    /// Keep a patch the server only partly confirmed
    ///
    /// Every partition and indicator the patch changed is dropped and queued
    /// for refetch, so unwritten keys are re-resolved rather than trusted.
    pub fn commit_unconfirmed(&mut self, patch: CachePatch) {
        let touched = patch.touched();
        for key in patch.partitions.into_keys() {
            self.partitions.remove(&key);
            self.invalidated.insert(CacheKey::Partition(key));
        }
        for key in patch.indicators.into_keys() {
            self.indicators.remove(&key);
            self.invalidated.insert(CacheKey::Indicator(key));
        }
        tracing::debug!(touched, "Unconfirmed cache patch queued for refetch");
    }

    /// Restore the pre-mutation state of everything the patch touched
    pub fn rollback(&mut self, patch: CachePatch) {
        let touched = patch.touched();
        for (key, before) in patch.partitions {
            match before {
                Some(partition) => self.partitions.insert(key, partition),
                None => self.partitions.remove(&key),
            };
        }
        for (key, before) in patch.indicators {
            match before {
                Some(indicator) => self.indicators.insert(key, indicator),
                None => self.indicators.remove(&key),
            };
        }
        for key in &patch.invalidated {
            self.invalidated.remove(key);
        }
        tracing::debug!(touched, "Cache patch rolled back");
    }

    fn apply_plan(&mut self, plan: &SyncPlan, session: &CacheSession, patch: &mut CachePatch) {
        let tenant_id = session.tenant_id.as_str();

        for (kind, id) in &plan.removed {
            for key in self.partition_keys(tenant_id, *kind) {
                self.edit_partition(patch, &key, |p| p.remove(*id));
            }
            for key in self.indicator_keys(tenant_id, *kind) {
                self.edit_indicator(patch, &key, |i| i.forget(*id));
            }
        }

        for row in &plan.replaced {
            for key in self.partition_keys(tenant_id, row.kind) {
                self.edit_partition(patch, &key, |p| p.replace(row));
            }
        }

        let mut overrides = Overrides::new();
        let mut touched: BTreeMap<i64, (CatalogEntity, BTreeSet<i64>, BTreeSet<Channel>)> =
            BTreeMap::new();
        for cell in &plan.cells {
            let entity = &cell.entity;
            overrides.insert((entity.id, cell.location_id, cell.channel), cell.visible);

            let key = PartitionKey::cell(tenant_id, entity.kind, cell.location_id, cell.channel);
            self.edit_partition(patch, &key, |p| {
                if cell.visible {
                    p.upsert(entity)
                } else {
                    p.remove(entity.id)
                }
            });

            let key = IndicatorKey::new(tenant_id, entity.kind, cell.location_id, cell.channel);
            let in_scope = entity.permits(cell.channel) && entity.reachable_at(cell.location_id);
            self.edit_indicator(patch, &key, |i| {
                if in_scope {
                    i.set(entity.id, cell.visible)
                } else {
                    i.forget(entity.id)
                }
            });

            let entry = touched
                .entry(entity.id)
                .or_insert_with(|| (entity.clone(), BTreeSet::new(), BTreeSet::new()));
            entry.0 = entity.clone();
            entry.1.insert(cell.location_id);
            entry.2.insert(cell.channel);
        }

        for (entity, locations, channels) in touched.values() {
            let mut keys: Vec<PartitionKey> = locations
                .iter()
                .map(|l| PartitionKey::new(tenant_id, entity.kind, LocationKey::At(*l), ChannelKey::All))
                .collect();
            keys.extend(channels.iter().map(|c| {
                PartitionKey::new(tenant_id, entity.kind, LocationKey::All, ChannelKey::Only(*c))
            }));
            keys.push(PartitionKey::new(tenant_id, entity.kind, LocationKey::All, ChannelKey::All));

            for key in keys {
                if !self.partitions.contains_key(&key) {
                    continue;
                }
                match self.derive(entity, &key, &overrides, session) {
                    Aggregate::Visible => {
                        self.edit_partition(patch, &key, |p| p.upsert(entity));
                    }
                    Aggregate::Hidden => {
                        self.edit_partition(patch, &key, |p| p.remove(entity.id));
                    }
                    Aggregate::Unknown => self.drop_partition(patch, &key),
                }
            }
        }

        for kind in &plan.invalidate_kinds {
            for key in self.partition_keys(tenant_id, *kind) {
                self.drop_partition(patch, &key);
            }
        }
        for kind in plan.invalidate_kinds.iter().chain(&plan.stale_indicators) {
            for key in self.indicator_keys(tenant_id, *kind) {
                self.drop_indicator(patch, &key);
            }
        }
        for key in &plan.invalidate {
            self.drop_partition(patch, key);
        }
    }

    /// Known visibility of one cell: the mutation's result, else the cached
    /// cell partition, else unknown
    fn cell_state(&self, entity: &CatalogEntity, location_id: i64, channel: Channel, overrides: &Overrides) -> Option<bool> {
        if !entity.reachable_at(location_id) || !entity.permits(channel) {
            return Some(false);
        }
        if let Some(visible) = overrides.get(&(entity.id, location_id, channel)) {
            return Some(*visible);
        }
        self.partitions
            .get(&PartitionKey::cell(&entity.tenant_id, entity.kind, location_id, channel))
            .map(|p| p.contains(entity.id))
    }

    /// Re-derive an aggregate partition row from the cell states
    fn derive(
        &self,
        entity: &CatalogEntity,
        key: &PartitionKey,
        overrides: &Overrides,
        session: &CacheSession,
    ) -> Aggregate {
        let channels: Vec<Channel> = match key.channel {
            ChannelKey::All => Channel::ALL.to_vec(),
            ChannelKey::Only(c) => vec![c],
        };
        match key.location {
            LocationKey::At(l) if channels.len() == 2 => aggregate_channels(
                self.cell_state(entity, l, Channel::DineIn, overrides),
                self.cell_state(entity, l, Channel::Online, overrides),
            ),
            LocationKey::At(l) => {
                aggregate_any(channels.iter().map(|c| self.cell_state(entity, l, *c, overrides)))
            }
            LocationKey::All => {
                let locations = session.reachable(entity);
                if locations.is_empty() {
                    // tenant without locations resolves against the baseline
                    return Aggregate::Unknown;
                }
                aggregate_any(locations.iter().flat_map(|l| {
                    channels
                        .iter()
                        .map(move |c| self.cell_state(entity, *l, *c, overrides))
                }))
            }
        }
    }

    fn partition_keys(&self, tenant_id: &str, kind: EntityKind) -> Vec<PartitionKey> {
        self.partitions
            .keys()
            .filter(|k| k.tenant_id == tenant_id && k.kind == kind)
            .cloned()
            .collect()
    }

    fn indicator_keys(&self, tenant_id: &str, kind: EntityKind) -> Vec<IndicatorKey> {
        self.indicators
            .keys()
            .filter(|k| k.tenant_id == tenant_id && k.kind == kind)
            .cloned()
            .collect()
    }

    /// Run `edit` on a cached partition, snapshotting it first
    fn edit_partition(
        &mut self,
        patch: &mut CachePatch,
        key: &PartitionKey,
        edit: impl FnOnce(&mut Partition) -> bool,
    ) {
        let Some(partition) = self.partitions.get(key) else {
            return;
        };
        let mut edited = partition.clone();
        if edit(&mut edited) {
            patch.remember_partition(key, Some(partition));
            self.partitions.insert(key.clone(), edited);
        }
    }

    fn edit_indicator(
        &mut self,
        patch: &mut CachePatch,
        key: &IndicatorKey,
        edit: impl FnOnce(&mut ChannelIndicator) -> bool,
    ) {
        let Some(indicator) = self.indicators.get(key) else {
            return;
        };
        let mut edited = indicator.clone();
        if edit(&mut edited) {
            patch.remember_indicator(key, Some(indicator));
            self.indicators.insert(key.clone(), edited);
        }
    }

    fn drop_partition(&mut self, patch: &mut CachePatch, key: &PartitionKey) {
        let Some(partition) = self.partitions.get(key) else {
            return;
        };
        patch.remember_partition(key, Some(partition));
        self.partitions.remove(key);
        let cache_key = CacheKey::Partition(key.clone());
        if self.invalidated.insert(cache_key.clone()) {
            patch.invalidated.push(cache_key);
        }
    }

    fn drop_indicator(&mut self, patch: &mut CachePatch, key: &IndicatorKey) {
        let Some(indicator) = self.indicators.get(key) else {
            return;
        };
        patch.remember_indicator(key, Some(indicator));
        self.indicators.remove(key);
        let cache_key = CacheKey::Indicator(key.clone());
        if self.invalidated.insert(cache_key.clone()) {
            patch.invalidated.push(cache_key);
        }
    }
}
