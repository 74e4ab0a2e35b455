//! Cache partitions and channel indicators

use std::collections::BTreeSet;

use shared::models::{CatalogEntity, Channel, EntityKind, ListQuery};

/// Location part of a partition key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationKey {
    All,
    At(i64),
}

/// Channel part of a partition key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKey {
    All,
    Only(Channel),
}

/// One cached `list` response: `(tenant, kind, location-or-all, channel-or-all)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub tenant_id: String,
    pub kind: EntityKind,
    pub location: LocationKey,
    pub channel: ChannelKey,
}

impl PartitionKey {
    pub fn new(
        tenant_id: impl Into<String>,
        kind: EntityKind,
        location: LocationKey,
        channel: ChannelKey,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            kind,
            location,
            channel,
        }
    }

    /// Single `(location, channel)` cell
    pub fn cell(tenant_id: impl Into<String>, kind: EntityKind, location_id: i64, channel: Channel) -> Self {
        Self::new(tenant_id, kind, LocationKey::At(location_id), ChannelKey::Only(channel))
    }

    pub fn is_cell(&self) -> bool {
        matches!(
            (self.location, self.channel),
            (LocationKey::At(_), ChannelKey::Only(_))
        )
    }

    /// Query that refills this partition
    pub fn query(&self) -> ListQuery {
        ListQuery {
            location_id: match self.location {
                LocationKey::All => None,
                LocationKey::At(id) => Some(id),
            },
            channel: match self.channel {
                ChannelKey::All => None,
                ChannelKey::Only(c) => Some(c),
            },
        }
    }
}

/// Resolved rows of one partition, in server order (`sort_order`, `id`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    rows: Vec<CatalogEntity>,
}

impl Partition {
    pub fn new(mut rows: Vec<CatalogEntity>) -> Self {
        rows.sort_by_key(|e| (e.sort_order, e.id));
        Self { rows }
    }

    pub fn rows(&self) -> &[CatalogEntity] {
        &self.rows
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.iter().map(|e| e.id).collect()
    }

    pub fn get(&self, id: i64) -> Option<&CatalogEntity> {
        self.rows.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    /// Insert or replace a row, keeping server order; returns whether anything changed
    pub fn upsert(&mut self, entity: &CatalogEntity) -> bool {
        if let Some(existing) = self.rows.iter().position(|e| e.id == entity.id) {
            if self.rows[existing] == *entity {
                return false;
            }
            self.rows.remove(existing);
        }
        let at = self
            .rows
            .partition_point(|e| (e.sort_order, e.id) < (entity.sort_order, entity.id));
        self.rows.insert(at, entity.clone());
        true
    }

    /// Replace a row only if present
    pub fn replace(&mut self, entity: &CatalogEntity) -> bool {
        self.contains(entity.id) && self.upsert(entity)
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|e| e.id != id);
        self.rows.len() != before
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Key of a channel indicator: one `(location, channel)` of one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndicatorKey {
    pub tenant_id: String,
    pub kind: EntityKind,
    pub location_id: i64,
    pub channel: Channel,
}

impl IndicatorKey {
    pub fn new(tenant_id: impl Into<String>, kind: EntityKind, location_id: i64, channel: Channel) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            kind,
            location_id,
            channel,
        }
    }
}

/// Hidden entities at one `(location, channel)`
///
/// Drives the "something is switched off on this channel" badge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelIndicator {
    hidden: BTreeSet<i64>,
}

impl ChannelIndicator {
    pub fn new(hidden: impl IntoIterator<Item = i64>) -> Self {
        Self {
            hidden: hidden.into_iter().collect(),
        }
    }

    pub fn has_alert(&self) -> bool {
        !self.hidden.is_empty()
    }

    pub fn is_hidden(&self, id: i64) -> bool {
        self.hidden.contains(&id)
    }

    pub(crate) fn set(&mut self, id: i64, visible: bool) -> bool {
        if visible {
            self.hidden.remove(&id)
        } else {
            self.hidden.insert(id)
        }
    }

    pub(crate) fn forget(&mut self, id: i64) -> bool {
        self.hidden.remove(&id)
    }
}

/// Anything the cache can drop and ask the caller to refetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Partition(PartitionKey),
    Indicator(IndicatorKey),
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ChannelScope;

    fn row(id: i64, sort_order: i32) -> CatalogEntity {
        CatalogEntity {
            id,
            tenant_id: "t1".into(),
            kind: EntityKind::Category,
            name: format!("row-{id}"),
            category_id: None,
            location_id: None,
            channel_scope: ChannelScope::All,
            sort_order,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_upsert_keeps_server_order() {
        let mut p = Partition::new(vec![row(3, 1), row(1, 0)]);
        assert_eq!(p.ids(), vec![1, 3]);
        assert!(p.upsert(&row(2, 0)));
        assert_eq!(p.ids(), vec![1, 2, 3]);
        assert!(!p.upsert(&row(2, 0)));

        // moved by sort order
        assert!(p.replace(&row(1, 5)));
        assert_eq!(p.ids(), vec![2, 3, 1]);
        assert!(!p.replace(&row(9, 0)));
        assert!(p.remove(3));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_indicator_alert() {
        let mut indicator = ChannelIndicator::default();
        assert!(!indicator.has_alert());
        indicator.set(7, false);
        assert!(indicator.has_alert() && indicator.is_hidden(7));
        indicator.set(7, true);
        assert!(!indicator.has_alert());
    }

    #[test]
    fn test_partition_query() {
        let key = PartitionKey::cell("t1", EntityKind::MenuItem, 4, Channel::Online);
        assert!(key.is_cell());
        let query = key.query();
        assert_eq!(query.location_id, Some(4));
        assert_eq!(query.channel, Some(Channel::Online));

        let global = PartitionKey::new("t1", EntityKind::MenuItem, LocationKey::All, ChannelKey::All);
        assert!(!global.is_cell());
        assert_eq!(global.query().location_id, None);
    }
}
