//! Catalog API abstraction
//!
//! [`HttpClient`](crate::HttpClient) talks to qravy-cloud; tests and the
//! optimistic wrapper only depend on this trait.

use async_trait::async_trait;
use shared::models::{
    BulkVisibilityRequest, BulkVisibilityResult, CatalogEntity, DeleteQuery, DeleteResult,
    EntityCreate, EntityKind, EntityUpdate, ListQuery, Location,
};

use crate::ClientResult;

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list(&self, kind: EntityKind, query: &ListQuery) -> ClientResult<Vec<CatalogEntity>>;

    async fn create(&self, kind: EntityKind, payload: &EntityCreate) -> ClientResult<CatalogEntity>;

    async fn update(
        &self,
        kind: EntityKind,
        id: i64,
        payload: &EntityUpdate,
    ) -> ClientResult<CatalogEntity>;

    async fn delete(&self, kind: EntityKind, id: i64, query: DeleteQuery) -> ClientResult<DeleteResult>;

    async fn set_visibility(
        &self,
        kind: EntityKind,
        request: &BulkVisibilityRequest,
    ) -> ClientResult<BulkVisibilityResult>;

    async fn locations(&self) -> ClientResult<Vec<Location>>;
}
