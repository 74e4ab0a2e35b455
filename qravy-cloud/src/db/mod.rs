//! Store access layer
//!
//! `CatalogStore` is the seam between the coordinator and persistence.
//! `PgStore` backs production; `MemoryStore` backs development and tests.
//! Every method is scoped to one tenant and never crosses tenants.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::models::{
    CatalogEntity, Channel, EntityKind, Location, LocationFilter, OverlayKey, OverlayRecord,
};

use crate::BoxError;
use crate::audit::{AuditEntry, AuditLogRequest};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ── Locations ──

    async fn list_locations(&self, tenant_id: &str) -> Result<Vec<Location>, BoxError>;

    async fn get_location(
        &self,
        tenant_id: &str,
        location_id: i64,
    ) -> Result<Option<Location>, BoxError>;

    // ── Baseline entities ──

    /// Baseline candidates for a location filter, ordered by `sort_order, id`
    ///
    /// `At(l)` returns global entities plus those bound to `l`.
    async fn list_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        location: LocationFilter,
    ) -> Result<Vec<CatalogEntity>, BoxError>;

    async fn get_entity(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<CatalogEntity>, BoxError>;

    async fn get_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<CatalogEntity>, BoxError>;

    /// Entities of a kind whose name matches case-insensitively
    async fn find_by_name(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<CatalogEntity>, BoxError>;

    async fn list_items_in_category(
        &self,
        tenant_id: &str,
        category_id: i64,
    ) -> Result<Vec<CatalogEntity>, BoxError>;

    async fn insert_entity(&self, entity: &CatalogEntity) -> Result<(), BoxError>;

    async fn update_entity(&self, entity: &CatalogEntity) -> Result<(), BoxError>;

    /// Hard-delete an entity and every overlay keyed to it
    async fn delete_entity(&self, tenant_id: &str, id: i64) -> Result<bool, BoxError>;

    // ── Overlays ──

    /// Overlays of a kind; `At(l)` limits to location `l`
    async fn list_overlays(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        location: LocationFilter,
    ) -> Result<Vec<OverlayRecord>, BoxError>;

    async fn entity_overlays(
        &self,
        tenant_id: &str,
        entity_id: i64,
    ) -> Result<Vec<OverlayRecord>, BoxError>;

    /// Insert or replace the record at its key (last write wins)
    async fn upsert_overlay(&self, record: &OverlayRecord) -> Result<(), BoxError>;

    /// Remove the record at a key; `false` when none existed
    async fn clear_overlay(&self, key: &OverlayKey) -> Result<bool, BoxError>;

    /// Remove every overlay of an entity for one channel
    async fn clear_channel_overlays(
        &self,
        tenant_id: &str,
        entity_id: i64,
        channel: Channel,
    ) -> Result<u64, BoxError>;

    // ── Audit ──

    async fn append_audit(&self, req: &AuditLogRequest) -> Result<AuditEntry, BoxError>;

    /// Newest first
    async fn query_audit(
        &self,
        tenant_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, BoxError>;

    // ── Health ──

    /// Short backend name reported by `/health`
    fn backend(&self) -> &'static str;

    /// Cheapest round-trip that proves the store answers
    async fn ping(&self) -> Result<(), BoxError>;
}
