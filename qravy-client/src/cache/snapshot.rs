//! Pre-mutation snapshot of everything a patch touched

use std::collections::HashMap;

use super::partition::{CacheKey, ChannelIndicator, IndicatorKey, Partition, PartitionKey};

/// Optimistic patch returned by [`CatalogCache::apply`](super::CatalogCache::apply)
///
/// Holds the first-seen state of every partition and indicator it changed
/// (`None` = absent before) plus the keys it newly queued for refetch.
/// Pass it back to `commit` or `rollback` exactly once.
#[derive(Debug, Default)]
#[must_use = "a patch must be committed or rolled back"]
pub struct CachePatch {
    pub(super) partitions: HashMap<PartitionKey, Option<Partition>>,
    pub(super) indicators: HashMap<IndicatorKey, Option<ChannelIndicator>>,
    pub(super) invalidated: Vec<CacheKey>,
}

impl CachePatch {
    /// Nothing cached was affected
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty() && self.indicators.is_empty() && self.invalidated.is_empty()
    }

    /// Number of partitions and indicators changed or dropped
    pub fn touched(&self) -> usize {
        self.partitions.len() + self.indicators.len()
    }

    /// Keys this patch queued for refetch
    pub fn invalidated(&self) -> &[CacheKey] {
        &self.invalidated
    }

    pub(super) fn remember_partition(&mut self, key: &PartitionKey, current: Option<&Partition>) {
        self.partitions
            .entry(key.clone())
            .or_insert_with(|| current.cloned());
    }

    pub(super) fn remember_indicator(&mut self, key: &IndicatorKey, current: Option<&ChannelIndicator>) {
        self.indicators
            .entry(key.clone())
            .or_insert_with(|| current.cloned());
    }
}
