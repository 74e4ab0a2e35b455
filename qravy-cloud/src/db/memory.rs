//! In-memory store for development and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use shared::models::{
    CatalogEntity, Channel, EntityKind, Location, LocationFilter, OverlayKey, OverlayRecord,
};
use shared::util::{normalize_name, now_millis};

use super::CatalogStore;
use crate::BoxError;
use crate::audit::{AuditEntry, AuditLogRequest};

#[derive(Default)]
pub struct MemoryStore {
    locations: DashMap<i64, Location>,
    entities: DashMap<i64, CatalogEntity>,
    overlays: DashMap<OverlayKey, OverlayRecord>,
    audit: RwLock<Vec<AuditEntry>>,
    audit_seq: AtomicI64,
    /// Remaining injected failures per overlay key
    overlay_failures: Mutex<HashMap<OverlayKey, u32>>,
    audit_failing: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_location(&self, location: Location) {
        self.locations.insert(location.id, location);
    }

    /// Make the next `times` writes to `key` fail
    pub fn fail_overlay_writes(&self, key: OverlayKey, times: u32) {
        self.overlay_failures.lock().insert(key, times);
    }

    pub fn fail_audit_writes(&self, failing: bool) {
        self.audit_failing.store(failing, Ordering::SeqCst);
    }

    /// Make `ping` fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored overlay records for a tenant
    pub fn overlay_count(&self, tenant_id: &str) -> usize {
        self.overlays
            .iter()
            .filter(|r| r.key().tenant_id == tenant_id)
            .count()
    }

    fn check_overlay_failure(&self, key: &OverlayKey) -> Result<(), BoxError> {
        let mut failures = self.overlay_failures.lock();
        if let Some(remaining) = failures.get_mut(key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(format!(
                "injected overlay write failure for entity {} at {}/{}",
                key.entity_id, key.location_id, key.channel
            )
            .into());
        }
        Ok(())
    }

    fn sorted(mut entities: Vec<CatalogEntity>) -> Vec<CatalogEntity> {
        entities.sort_by_key(|e| (e.sort_order, e.id));
        entities
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_locations(&self, tenant_id: &str) -> Result<Vec<Location>, BoxError> {
        let mut locations: Vec<Location> = self
            .locations
            .iter()
            .filter(|l| l.tenant_id == tenant_id)
            .map(|l| l.value().clone())
            .collect();
        locations.sort_by_key(|l| l.id);
        Ok(locations)
    }

    async fn get_location(
        &self,
        tenant_id: &str,
        location_id: i64,
    ) -> Result<Option<Location>, BoxError> {
        Ok(self
            .locations
            .get(&location_id)
            .filter(|l| l.tenant_id == tenant_id)
            .map(|l| l.value().clone()))
    }

    async fn list_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        location: LocationFilter,
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let entities = self
            .entities
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.kind == kind)
            .filter(|e| match location {
                LocationFilter::All => true,
                LocationFilter::At(id) => e.reachable_at(id),
            })
            .map(|e| e.value().clone())
            .collect();
        Ok(Self::sorted(entities))
    }

    async fn get_entity(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<CatalogEntity>, BoxError> {
        Ok(self
            .entities
            .get(&id)
            .filter(|e| e.tenant_id == tenant_id && e.kind == kind)
            .map(|e| e.value().clone()))
    }

    async fn get_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let mut found = Vec::new();
        for id in ids {
            if let Some(e) = self.get_entity(tenant_id, kind, *id).await?
                && !found.iter().any(|f: &CatalogEntity| f.id == e.id)
            {
                found.push(e);
            }
        }
        Ok(found)
    }

    async fn find_by_name(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let wanted = normalize_name(name);
        let entities = self
            .entities
            .iter()
            .filter(|e| {
                e.tenant_id == tenant_id && e.kind == kind && normalize_name(&e.name) == wanted
            })
            .map(|e| e.value().clone())
            .collect();
        Ok(Self::sorted(entities))
    }

    async fn list_items_in_category(
        &self,
        tenant_id: &str,
        category_id: i64,
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let items = self
            .entities
            .iter()
            .filter(|e| {
                e.tenant_id == tenant_id
                    && e.kind == EntityKind::MenuItem
                    && e.category_id == Some(category_id)
            })
            .map(|e| e.value().clone())
            .collect();
        Ok(Self::sorted(items))
    }

    async fn insert_entity(&self, entity: &CatalogEntity) -> Result<(), BoxError> {
        if self.entities.contains_key(&entity.id) {
            return Err(format!("entity {} already exists", entity.id).into());
        }
        self.entities.insert(entity.id, entity.clone());
        Ok(())
    }

    async fn update_entity(&self, entity: &CatalogEntity) -> Result<(), BoxError> {
        match self.entities.get_mut(&entity.id) {
            Some(mut existing) if existing.tenant_id == entity.tenant_id => {
                *existing = entity.clone();
                Ok(())
            }
            _ => Err(format!("entity {} not found", entity.id).into()),
        }
    }

    async fn delete_entity(&self, tenant_id: &str, id: i64) -> Result<bool, BoxError> {
        let removed = self
            .entities
            .remove_if(&id, |_, e| e.tenant_id == tenant_id)
            .is_some();
        if removed {
            self.overlays
                .retain(|k, _| !(k.tenant_id == tenant_id && k.entity_id == id));
        }
        Ok(removed)
    }

    async fn list_overlays(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        location: LocationFilter,
    ) -> Result<Vec<OverlayRecord>, BoxError> {
        Ok(self
            .overlays
            .iter()
            .filter(|r| r.key.tenant_id == tenant_id && r.kind == kind)
            .filter(|r| match location {
                LocationFilter::All => true,
                LocationFilter::At(id) => r.key.location_id == id,
            })
            .map(|r| r.value().clone())
            .collect())
    }

    async fn entity_overlays(
        &self,
        tenant_id: &str,
        entity_id: i64,
    ) -> Result<Vec<OverlayRecord>, BoxError> {
        let mut records: Vec<OverlayRecord> = self
            .overlays
            .iter()
            .filter(|r| r.key.tenant_id == tenant_id && r.key.entity_id == entity_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn upsert_overlay(&self, record: &OverlayRecord) -> Result<(), BoxError> {
        if record.state.is_baseline() {
            return Err("baseline state is not stored".into());
        }
        self.check_overlay_failure(&record.key)?;
        self.overlays.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn clear_overlay(&self, key: &OverlayKey) -> Result<bool, BoxError> {
        self.check_overlay_failure(key)?;
        Ok(self.overlays.remove(key).is_some())
    }

    async fn clear_channel_overlays(
        &self,
        tenant_id: &str,
        entity_id: i64,
        channel: Channel,
    ) -> Result<u64, BoxError> {
        let mut removed = 0u64;
        self.overlays.retain(|k, _| {
            let matches = k.tenant_id == tenant_id && k.entity_id == entity_id && k.channel == channel;
            removed += u64::from(matches);
            !matches
        });
        Ok(removed)
    }

    async fn append_audit(&self, req: &AuditLogRequest) -> Result<AuditEntry, BoxError> {
        if self.audit_failing.load(Ordering::SeqCst) {
            return Err("injected audit write failure".into());
        }
        let entry = AuditEntry {
            id: self.audit_seq.fetch_add(1, Ordering::SeqCst) + 1,
            tenant_id: req.tenant_id.clone(),
            action: req.action,
            resource_type: req.resource_type.clone(),
            resource_id: req.resource_id.clone(),
            operator: req.operator.clone(),
            details: req.details.clone(),
            created_at: now_millis(),
        };
        self.audit.write().push(entry.clone());
        Ok(entry)
    }

    async fn query_audit(
        &self,
        tenant_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, BoxError> {
        let audit = self.audit.read();
        Ok(audit
            .iter()
            .rev()
            .filter(|e| e.tenant_id == tenant_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), BoxError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err("memory store marked unavailable".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ChannelScope, ScopeState};

    fn entity(id: i64, name: &str, location_id: Option<i64>) -> CatalogEntity {
        CatalogEntity {
            id,
            tenant_id: "t1".into(),
            kind: EntityKind::Category,
            name: name.into(),
            category_id: None,
            location_id,
            channel_scope: ChannelScope::All,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn overlay(entity_id: i64, location_id: i64, state: ScopeState) -> OverlayRecord {
        OverlayRecord {
            key: OverlayKey::new("t1", entity_id, location_id, Channel::Online),
            kind: EntityKind::Category,
            state,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn test_list_entities_by_location() {
        let store = MemoryStore::new();
        store.insert_entity(&entity(2, "Global", None)).await.unwrap();
        store.insert_entity(&entity(1, "Bound", Some(10))).await.unwrap();
        store.insert_entity(&entity(3, "Elsewhere", Some(11))).await.unwrap();

        let at = store
            .list_entities("t1", EntityKind::Category, LocationFilter::At(10))
            .await
            .unwrap();
        assert_eq!(at.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);

        let all = store
            .list_entities("t1", EntityKind::Category, LocationFilter::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let other_tenant = store
            .list_entities("t2", EntityKind::Category, LocationFilter::All)
            .await
            .unwrap();
        assert!(other_tenant.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_state_at_key() {
        let store = MemoryStore::new();
        store.insert_entity(&entity(1, "Drinks", None)).await.unwrap();
        store
            .upsert_overlay(&overlay(1, 10, ScopeState::Overlay { visible: false }))
            .await
            .unwrap();
        store.upsert_overlay(&overlay(1, 10, ScopeState::Tombstone)).await.unwrap();

        let records = store.entity_overlays("t1", 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, ScopeState::Tombstone);
        assert!(store.upsert_overlay(&overlay(1, 10, ScopeState::Baseline)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_entity_drops_overlays() {
        let store = MemoryStore::new();
        store.insert_entity(&entity(1, "Drinks", None)).await.unwrap();
        store.upsert_overlay(&overlay(1, 10, ScopeState::Tombstone)).await.unwrap();
        assert!(store.delete_entity("t1", 1).await.unwrap());
        assert_eq!(store.overlay_count("t1"), 0);
        assert!(!store.delete_entity("t1", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_name_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert_entity(&entity(1, "Drinks", None)).await.unwrap();
        let found = store
            .find_by_name("t1", EntityKind::Category, " drinks ")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let store = MemoryStore::new();
        let record = overlay(1, 10, ScopeState::Tombstone);
        store.fail_overlay_writes(record.key.clone(), 1);
        assert!(store.upsert_overlay(&record).await.is_err());
        assert!(store.upsert_overlay(&record).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_channel_counts_only_its_own_removals() {
        let store = std::sync::Arc::new(MemoryStore::new());
        for location_id in [10, 11, 12] {
            store.upsert_overlay(&overlay(1, location_id, ScopeState::Tombstone)).await.unwrap();
        }
        let dine_in = OverlayRecord {
            key: OverlayKey::new("t1", 1, 10, Channel::DineIn),
            ..overlay(1, 10, ScopeState::Tombstone)
        };
        store.upsert_overlay(&dine_in).await.unwrap();

        // writes to other entities land while the channel is cleared
        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for entity_id in 100..400 {
                    store
                        .upsert_overlay(&overlay(entity_id, 10, ScopeState::Overlay { visible: false }))
                        .await
                        .unwrap();
                }
            })
        };
        let removed = store
            .clear_channel_overlays("t1", 1, Channel::Online)
            .await
            .unwrap();
        writer.await.unwrap();

        assert_eq!(removed, 3);
        let left = store.entity_overlays("t1", 1).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].key.channel, Channel::DineIn);
        assert_eq!(store.overlay_count("t1"), 301);
    }
}
