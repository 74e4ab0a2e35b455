//! Optimistic catalog: patch the cache, call the server, then commit or roll back

use shared::models::{
    BulkVisibilityRequest, BulkVisibilityResult, CatalogEntity, DeleteQuery, DeleteResult,
    EntityCreate, EntityKind, EntityUpdate,
};

use crate::cache::{CacheKey, CacheSession, CatalogCache, CatalogMutation, PartitionKey};
use crate::{CatalogApi, ClientResult};

/// Catalog front-end for one tenant session
///
/// Runs on the UI's single logical thread: one mutation at a time, each one
/// visible in the cache before the server answers.
pub struct OptimisticCatalog<A: CatalogApi> {
    api: A,
    cache: CatalogCache,
    session: CacheSession,
}

impl<A: CatalogApi> OptimisticCatalog<A> {
    pub fn new(api: A, session: CacheSession) -> Self {
        Self {
            api,
            cache: CatalogCache::new(),
            session,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CatalogCache {
        &mut self.cache
    }

    pub fn session(&self) -> &CacheSession {
        &self.session
    }

    /// Fetch one partition from the server into the cache
    pub async fn refresh(&mut self, key: PartitionKey) -> ClientResult<usize> {
        let rows = self.api.list(key.kind, &key.query()).await?;
        let count = rows.len();
        self.cache.load_partition(key, rows);
        Ok(count)
    }

    /// Refetch every dropped partition of this session
    ///
    /// Dropped indicators are returned for the caller to reload. On error
    /// everything not yet refetched stays queued.
    pub async fn refetch_invalidated(&mut self) -> ClientResult<Vec<CacheKey>> {
        let keys = self.cache.take_invalidated();
        let mut pending = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            match key {
                CacheKey::Partition(partition) if partition.tenant_id == self.session.tenant_id => {
                    if let Err(e) = self.refresh(partition.clone()).await {
                        for key in keys[i..].iter().chain(&pending) {
                            self.cache.requeue(key.clone());
                        }
                        return Err(e);
                    }
                }
                other => pending.push(other.clone()),
            }
        }
        Ok(pending)
    }

    pub async fn set_visibility(
        &mut self,
        kind: EntityKind,
        request: BulkVisibilityRequest,
    ) -> ClientResult<BulkVisibilityResult> {
        let patch = self.cache.apply(
            &CatalogMutation::SetVisibility {
                kind,
                request: request.clone(),
            },
            &self.session,
        );
        match self.api.set_visibility(kind, &request).await {
            Ok(result) => {
                if result.modified_count < result.matched_count {
                    tracing::debug!(
                        matched = result.matched_count,
                        modified = result.modified_count,
                        "Visibility change partly applied, refetching touched partitions"
                    );
                    self.cache.commit_unconfirmed(patch);
                } else {
                    self.cache.commit(patch);
                }
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Visibility change failed, rolling back: {e}");
                self.cache.rollback(patch);
                Err(e)
            }
        }
    }

    pub async fn delete(
        &mut self,
        kind: EntityKind,
        id: i64,
        query: DeleteQuery,
    ) -> ClientResult<DeleteResult> {
        let patch = self
            .cache
            .apply(&CatalogMutation::Delete { kind, id, query }, &self.session);
        match self.api.delete(kind, id, query).await {
            Ok(result) => {
                self.cache.commit(patch);
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(entity_id = id, "Delete failed, rolling back: {e}");
                self.cache.rollback(patch);
                Err(e)
            }
        }
    }

    /// Create on the server, then patch the cache with the returned entity
    pub async fn create(&mut self, kind: EntityKind, payload: EntityCreate) -> ClientResult<CatalogEntity> {
        let entity = self.api.create(kind, &payload).await?;
        let patch = self.cache.apply(
            &CatalogMutation::Created {
                entity: entity.clone(),
                payload,
            },
            &self.session,
        );
        self.cache.commit(patch);
        Ok(entity)
    }

    /// Update on the server, then patch the cache with the returned entity
    pub async fn update(
        &mut self,
        kind: EntityKind,
        id: i64,
        payload: EntityUpdate,
    ) -> ClientResult<CatalogEntity> {
        let entity = self.api.update(kind, id, &payload).await?;
        let patch = self.cache.apply(
            &CatalogMutation::Updated {
                entity: entity.clone(),
                payload,
            },
            &self.session,
        );
        self.cache.commit(patch);
        Ok(entity)
    }
}
