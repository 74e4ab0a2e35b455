//! Audit log types

use serde::{Deserialize, Serialize};
use shared::error::AppError;
use std::fmt;
use std::str::FromStr;

/// Audited catalog operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    EntityCreated,
    EntityUpdated,
    EntityDeleted,
    VisibilityChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::EntityCreated => "entity_created",
            AuditAction::EntityUpdated => "entity_updated",
            AuditAction::EntityDeleted => "entity_deleted",
            AuditAction::VisibilityChanged => "visibility_changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity_created" => Ok(AuditAction::EntityCreated),
            "entity_updated" => Ok(AuditAction::EntityUpdated),
            "entity_deleted" => Ok(AuditAction::EntityDeleted),
            "visibility_changed" => Ok(AuditAction::VisibilityChanged),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

/// Log request sent to the audit worker
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogRequest {
    pub tenant_id: String,
    pub action: AuditAction,
    /// `category` / `menu_item`
    pub resource_type: String,
    pub resource_id: String,
    pub operator: Option<String>,
    /// `{before, after, scope, affected_count}`
    pub details: serde_json::Value,
}

/// Stored audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub tenant_id: String,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub operator: Option<String>,
    pub details: serde_json::Value,
    pub created_at: i64,
}

/// Audit log page query
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl AuditQuery {
    /// `(limit, offset)`; 20 per page by default, at most 100
    pub fn limit_offset(&self) -> Result<(i64, i64), AppError> {
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let page = self.page.unwrap_or(1).max(1);
        let offset = (page - 1).checked_mul(per_page).ok_or_else(|| {
            AppError::validation(format!("page {page} is out of range")).with_detail("page", page)
        })?;
        Ok((per_page, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [
            AuditAction::EntityCreated,
            AuditAction::EntityUpdated,
            AuditAction::EntityDeleted,
            AuditAction::VisibilityChanged,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_paging() {
        assert_eq!(AuditQuery::default().limit_offset().unwrap(), (20, 0));
        let q = AuditQuery {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(q.limit_offset().unwrap(), (100, 200));
        let q = AuditQuery {
            page: Some(i64::MIN),
            per_page: Some(0),
        };
        assert_eq!(q.limit_offset().unwrap(), (1, 0));
    }

    #[test]
    fn test_paging_rejects_overflowing_page() {
        let q = AuditQuery {
            page: Some(i64::MAX),
            per_page: None,
        };
        let err = q.limit_offset().unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::ValidationFailed);

        // one page per row still fits
        let q = AuditQuery {
            page: Some(i64::MAX),
            per_page: Some(1),
        };
        assert_eq!(q.limit_offset().unwrap(), (1, i64::MAX - 1));
    }
}
