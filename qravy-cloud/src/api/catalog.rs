//! Catalog endpoints (`{kind}` = `categories` | `items`)

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::error::AppError;
use shared::models::{
    BulkVisibilityRequest, BulkVisibilityResult, CatalogEntity, DeleteQuery, DeleteResult,
    EntityCreate, EntityKind, EntityUpdate, ListQuery,
};

use super::ApiResult;
use crate::auth::CallerIdentity;
use crate::state::AppState;

fn parse_kind(segment: &str) -> Result<EntityKind, AppError> {
    EntityKind::from_path(segment)
        .ok_or_else(|| AppError::not_found(format!("Collection '{segment}'")))
}

/// GET /api/tenant/{kind}?location_id&channel
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<CatalogEntity>> {
    let kind = parse_kind(&kind)?;
    let entities = state.catalog.list(&identity, kind, &query).await?;
    Ok(Json(entities))
}

/// POST /api/tenant/{kind}
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(kind): Path<String>,
    Json(payload): Json<EntityCreate>,
) -> ApiResult<CatalogEntity> {
    let kind = parse_kind(&kind)?;
    let entity = state.catalog.create(&identity, kind, payload).await?;
    Ok(Json(entity))
}

/// PUT /api/tenant/{kind}/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path((kind, id)): Path<(String, i64)>,
    Json(payload): Json<EntityUpdate>,
) -> ApiResult<CatalogEntity> {
    let kind = parse_kind(&kind)?;
    let entity = state.catalog.update(&identity, kind, id, payload).await?;
    Ok(Json(entity))
}

/// DELETE /api/tenant/{kind}/{id}?location_id&channel
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path((kind, id)): Path<(String, i64)>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<DeleteResult> {
    let kind = parse_kind(&kind)?;
    let result = state.catalog.delete(&identity, kind, id, query).await?;
    Ok(Json(result))
}

/// POST /api/tenant/{kind}/visibility
pub async fn bulk_visibility(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(kind): Path<String>,
    Json(req): Json<BulkVisibilityRequest>,
) -> ApiResult<BulkVisibilityResult> {
    let kind = parse_kind(&kind)?;
    let result = state.catalog.bulk_set_visibility(&identity, kind, req).await?;
    Ok(Json(result))
}
