//! PostgreSQL store
//!
//! Rows are read into private row structs and converted into the shared
//! models; text columns (`kind`, `channel_scope`, `channel`) are parsed on
//! the way out so a bad row surfaces as an error instead of a panic.

use async_trait::async_trait;
use shared::models::{
    CatalogEntity, Channel, ChannelScope, EntityKind, Location, LocationFilter, OverlayKey,
    OverlayRecord, ScopeState,
};
use shared::util::now_millis;
use sqlx::PgPool;

use super::CatalogStore;
use crate::BoxError;
use crate::audit::{AuditAction, AuditEntry, AuditLogRequest};

const ENTITY_COLUMNS: &str = "id, tenant_id, kind, name, category_id, location_id, channel_scope, sort_order, created_at, updated_at";
const OVERLAY_COLUMNS: &str = "tenant_id, entity_id, kind, location_id, channel, visible, removed, updated_at";

#[derive(sqlx::FromRow)]
struct EntityRow {
    id: i64,
    tenant_id: String,
    kind: String,
    name: String,
    category_id: Option<i64>,
    location_id: Option<i64>,
    channel_scope: String,
    sort_order: i32,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<EntityRow> for CatalogEntity {
    type Error = BoxError;

    fn try_from(row: EntityRow) -> Result<Self, Self::Error> {
        Ok(CatalogEntity {
            id: row.id,
            tenant_id: row.tenant_id,
            kind: row.kind.parse::<EntityKind>()?,
            name: row.name,
            category_id: row.category_id,
            location_id: row.location_id,
            channel_scope: ChannelScope::try_from(row.channel_scope)?,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OverlayRow {
    tenant_id: String,
    entity_id: i64,
    kind: String,
    location_id: i64,
    channel: String,
    visible: Option<bool>,
    removed: bool,
    updated_at: i64,
}

impl TryFrom<OverlayRow> for OverlayRecord {
    type Error = BoxError;

    fn try_from(row: OverlayRow) -> Result<Self, Self::Error> {
        let channel = row.channel.parse::<Channel>()?;
        Ok(OverlayRecord {
            key: OverlayKey::new(row.tenant_id, row.entity_id, row.location_id, channel),
            kind: row.kind.parse::<EntityKind>()?,
            state: ScopeState::from_columns(row.visible, row.removed),
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    tenant_id: String,
    action: String,
    resource_type: String,
    resource_id: String,
    operator: Option<String>,
    detail: serde_json::Value,
    created_at: i64,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = BoxError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            action: row.action.parse::<AuditAction>()?,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            operator: row.operator,
            details: row.detail,
            created_at: row.created_at,
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, BoxError>
where
    T: TryFrom<R, Error = BoxError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(database_url: &str) -> Result<Self, BoxError> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_locations(&self, tenant_id: &str) -> Result<Vec<Location>, BoxError> {
        let rows: Vec<Location> = sqlx::query_as(
            "SELECT id, tenant_id, name FROM tenant_locations WHERE tenant_id = $1 ORDER BY id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_location(
        &self,
        tenant_id: &str,
        location_id: i64,
    ) -> Result<Option<Location>, BoxError> {
        let row: Option<Location> = sqlx::query_as(
            "SELECT id, tenant_id, name FROM tenant_locations WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        location: LocationFilter,
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let rows: Vec<EntityRow> = match location {
            LocationFilter::All => {
                sqlx::query_as(&format!(
                    "SELECT {ENTITY_COLUMNS} FROM catalog_entities \
                     WHERE tenant_id = $1 AND kind = $2 ORDER BY sort_order, id"
                ))
                .bind(tenant_id)
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            LocationFilter::At(location_id) => {
                sqlx::query_as(&format!(
                    "SELECT {ENTITY_COLUMNS} FROM catalog_entities \
                     WHERE tenant_id = $1 AND kind = $2 \
                     AND (location_id IS NULL OR location_id = $3) ORDER BY sort_order, id"
                ))
                .bind(tenant_id)
                .bind(kind.as_str())
                .bind(location_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        convert(rows)
    }

    async fn get_entity(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<CatalogEntity>, BoxError> {
        let row: Option<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM catalog_entities WHERE tenant_id = $1 AND kind = $2 AND id = $3"
        ))
        .bind(tenant_id)
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CatalogEntity::try_from).transpose()
    }

    async fn get_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let rows: Vec<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM catalog_entities \
             WHERE tenant_id = $1 AND kind = $2 AND id = ANY($3) ORDER BY sort_order, id"
        ))
        .bind(tenant_id)
        .bind(kind.as_str())
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn find_by_name(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let rows: Vec<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM catalog_entities \
             WHERE tenant_id = $1 AND kind = $2 AND lower(btrim(name)) = lower(btrim($3)) \
             ORDER BY sort_order, id"
        ))
        .bind(tenant_id)
        .bind(kind.as_str())
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn list_items_in_category(
        &self,
        tenant_id: &str,
        category_id: i64,
    ) -> Result<Vec<CatalogEntity>, BoxError> {
        let rows: Vec<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM catalog_entities \
             WHERE tenant_id = $1 AND kind = 'menu_item' AND category_id = $2 ORDER BY sort_order, id"
        ))
        .bind(tenant_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn insert_entity(&self, entity: &CatalogEntity) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO catalog_entities \
             (id, tenant_id, kind, name, category_id, location_id, channel_scope, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(entity.id)
        .bind(&entity.tenant_id)
        .bind(entity.kind.as_str())
        .bind(&entity.name)
        .bind(entity.category_id)
        .bind(entity.location_id)
        .bind(entity.channel_scope.as_str())
        .bind(entity.sort_order)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_entity(&self, entity: &CatalogEntity) -> Result<(), BoxError> {
        let result = sqlx::query(
            "UPDATE catalog_entities SET name = $1, channel_scope = $2, sort_order = $3, updated_at = $4 \
             WHERE tenant_id = $5 AND id = $6",
        )
        .bind(&entity.name)
        .bind(entity.channel_scope.as_str())
        .bind(entity.sort_order)
        .bind(entity.updated_at)
        .bind(&entity.tenant_id)
        .bind(entity.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(format!("entity {} not found", entity.id).into());
        }
        Ok(())
    }

    async fn delete_entity(&self, tenant_id: &str, id: i64) -> Result<bool, BoxError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM catalog_overlays WHERE tenant_id = $1 AND entity_id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM catalog_entities WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_overlays(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        location: LocationFilter,
    ) -> Result<Vec<OverlayRecord>, BoxError> {
        let rows: Vec<OverlayRow> = match location {
            LocationFilter::All => {
                sqlx::query_as(&format!(
                    "SELECT {OVERLAY_COLUMNS} FROM catalog_overlays WHERE tenant_id = $1 AND kind = $2"
                ))
                .bind(tenant_id)
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            LocationFilter::At(location_id) => {
                sqlx::query_as(&format!(
                    "SELECT {OVERLAY_COLUMNS} FROM catalog_overlays \
                     WHERE tenant_id = $1 AND kind = $2 AND location_id = $3"
                ))
                .bind(tenant_id)
                .bind(kind.as_str())
                .bind(location_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        convert(rows)
    }

    async fn entity_overlays(
        &self,
        tenant_id: &str,
        entity_id: i64,
    ) -> Result<Vec<OverlayRecord>, BoxError> {
        let rows: Vec<OverlayRow> = sqlx::query_as(&format!(
            "SELECT {OVERLAY_COLUMNS} FROM catalog_overlays \
             WHERE tenant_id = $1 AND entity_id = $2 ORDER BY location_id, channel"
        ))
        .bind(tenant_id)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn upsert_overlay(&self, record: &OverlayRecord) -> Result<(), BoxError> {
        if record.state.is_baseline() {
            return Err("baseline state is not stored".into());
        }
        let (visible, removed) = record.state.to_columns();
        sqlx::query(
            "INSERT INTO catalog_overlays \
             (tenant_id, entity_id, kind, location_id, channel, visible, removed, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (tenant_id, entity_id, location_id, channel) DO UPDATE SET \
             kind = EXCLUDED.kind, visible = EXCLUDED.visible, removed = EXCLUDED.removed, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(&record.key.tenant_id)
        .bind(record.key.entity_id)
        .bind(record.kind.as_str())
        .bind(record.key.location_id)
        .bind(record.key.channel.as_str())
        .bind(visible)
        .bind(removed)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_overlay(&self, key: &OverlayKey) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "DELETE FROM catalog_overlays \
             WHERE tenant_id = $1 AND entity_id = $2 AND location_id = $3 AND channel = $4",
        )
        .bind(&key.tenant_id)
        .bind(key.entity_id)
        .bind(key.location_id)
        .bind(key.channel.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_channel_overlays(
        &self,
        tenant_id: &str,
        entity_id: i64,
        channel: Channel,
    ) -> Result<u64, BoxError> {
        let result = sqlx::query(
            "DELETE FROM catalog_overlays WHERE tenant_id = $1 AND entity_id = $2 AND channel = $3",
        )
        .bind(tenant_id)
        .bind(entity_id)
        .bind(channel.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn append_audit(&self, req: &AuditLogRequest) -> Result<AuditEntry, BoxError> {
        let row: AuditRow = sqlx::query_as(
            "INSERT INTO audit_logs (tenant_id, action, resource_type, resource_id, operator, detail, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, tenant_id, action, resource_type, resource_id, operator, detail, created_at",
        )
        .bind(&req.tenant_id)
        .bind(req.action.as_str())
        .bind(&req.resource_type)
        .bind(&req.resource_id)
        .bind(&req.operator)
        .bind(&req.details)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;
        AuditEntry::try_from(row)
    }

    async fn query_audit(
        &self,
        tenant_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, BoxError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, tenant_id, action, resource_type, resource_id, operator, detail, created_at \
             FROM audit_logs WHERE tenant_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), BoxError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
