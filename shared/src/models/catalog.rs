//! Catalog entity model (categories and menu items)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::scope::{Channel, ChannelScope};

/// Which catalog table an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    MenuItem,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::MenuItem => "menu_item",
        }
    }

    /// Resolve the REST collection segment (`categories` / `items`)
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "categories" => Some(EntityKind::Category),
            "items" => Some(EntityKind::MenuItem),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::MenuItem => "items",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(EntityKind::Category),
            "menu_item" => Ok(EntityKind::MenuItem),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Baseline catalog document
///
/// Holds no effective visibility flag: visibility is always derived from
/// the base scope plus overlay records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: i64,
    pub tenant_id: String,
    pub kind: EntityKind,
    pub name: String,
    /// Parent category (menu items only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    /// `None` = global, `Some` = bound to one location
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub channel_scope: ChannelScope,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CatalogEntity {
    pub fn is_global(&self) -> bool {
        self.location_id.is_none()
    }

    /// Whether the entity exists (baseline) at the location
    pub fn reachable_at(&self, location_id: i64) -> bool {
        match self.location_id {
            None => true,
            Some(bound) => bound == location_id,
        }
    }

    pub fn permits(&self, channel: Channel) -> bool {
        self.channel_scope.permits(channel)
    }
}

/// Tenant location (branch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Location {
    pub id: i64,
    pub tenant_id: String,
    pub name: String,
}

/// Read request query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub location_id: Option<i64>,
    pub channel: Option<Channel>,
}

/// Create entity payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityCreate {
    pub name: String,
    /// Required for menu items
    pub category_id: Option<i64>,
    /// Binds the entity to one location
    pub location_id: Option<i64>,
    /// Restricts the entity to one channel
    pub channel: Option<Channel>,
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub include_location_ids: Vec<i64>,
    #[serde(default)]
    pub exclude_location_ids: Vec<i64>,
}

/// Update (rename / rescope) payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub name: Option<String>,
    /// A single channel, or `"both"` / `"all"`
    pub channel: Option<ChannelScope>,
    pub sort_order: Option<i32>,
    pub include_location_ids: Option<Vec<i64>>,
    pub exclude_location_ids: Option<Vec<i64>>,
    pub hard_exclude: Option<bool>,
}

/// Delete scope query
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeleteQuery {
    pub location_id: Option<i64>,
    pub channel: Option<Channel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted: bool,
    /// Dependent records changed by the cascade
    pub affected_count: u64,
}

/// Bulk visibility toggle payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkVisibilityRequest {
    pub ids: Vec<i64>,
    pub visible: bool,
    pub location_id: Option<i64>,
    pub channel: Option<Channel>,
    pub hard_exclude: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkVisibilityResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub items: Vec<CatalogEntity>,
}
