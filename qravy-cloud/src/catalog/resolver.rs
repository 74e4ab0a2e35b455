//! Read path: effective entity set for a request scope
//!
//! Baseline entities, overlays and (for the global view) tenant locations
//! are read in parallel, then handed to `shared::visibility::resolve`.

use shared::error::AppError;
use shared::models::{CatalogEntity, EntityKind, ListQuery, LocationFilter, RequestScope};
use shared::visibility::{self, OverlayIndex};

use super::CatalogService;
use crate::auth::CallerIdentity;
use crate::error::ServiceResult;

impl CatalogService {
    /// `list(tenant, location?, channel?)`
    ///
    /// Branch sessions always read their own location.
    pub async fn list(
        &self,
        caller: &CallerIdentity,
        kind: EntityKind,
        query: &ListQuery,
    ) -> ServiceResult<Vec<CatalogEntity>> {
        let location_id = caller.scoped_location(query.location_id)?;
        let scope = RequestScope::new(location_id, query.channel);
        self.resolve_scope(&caller.tenant_id, kind, scope).await
    }

    pub async fn resolve_scope(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        scope: RequestScope,
    ) -> ServiceResult<Vec<CatalogEntity>> {
        let (entities, overlays, locations) = tokio::try_join!(
            self.store.list_entities(tenant_id, kind, scope.location),
            self.store.list_overlays(tenant_id, kind, scope.location),
            self.store.list_locations(tenant_id),
        )?;

        let location_ids: Vec<i64> = locations.iter().map(|l| l.id).collect();
        if let LocationFilter::At(id) = scope.location
            && !location_ids.contains(&id)
        {
            return Err(AppError::location_not_found(id).into());
        }

        let index = OverlayIndex::from_records(&overlays);
        let resolved = visibility::resolve(entities, &scope, &index, &location_ids);

        tracing::debug!(
            tenant_id,
            kind = %kind,
            location = ?scope.location,
            channel = ?scope.channel,
            overlays = index.len(),
            count = resolved.len(),
            "Resolved catalog scope"
        );
        Ok(resolved)
    }
}
