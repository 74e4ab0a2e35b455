//! Audit log endpoint

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use shared::error::AppError;

use super::ApiResult;
use crate::audit::{AuditEntry, AuditQuery};
use crate::auth::CallerIdentity;
use crate::state::AppState;

/// GET /api/tenant/audit-log
pub async fn audit_log(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let (limit, offset) = query.limit_offset()?;

    let entries = state
        .catalog
        .store()
        .query_audit(&identity.tenant_id, limit, offset)
        .await
        .map_err(|e| {
            tracing::error!("Audit log query error: {e}");
            AppError::internal("Audit log unavailable")
        })?;

    Ok(Json(entries))
}
