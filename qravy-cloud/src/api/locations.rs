//! Tenant locations

use axum::{Extension, Json, extract::State};
use shared::models::Location;

use super::ApiResult;
use crate::auth::CallerIdentity;
use crate::error::ServiceError;
use crate::state::AppState;

/// GET /api/tenant/locations
///
/// Branch sessions only see their own location.
pub async fn list_locations(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> ApiResult<Vec<Location>> {
    let mut locations = state
        .catalog
        .store()
        .list_locations(&identity.tenant_id)
        .await
        .map_err(ServiceError::from)?;
    if let Some(own) = identity.location_id {
        locations.retain(|l| l.id == own);
    }
    Ok(Json(locations))
}
