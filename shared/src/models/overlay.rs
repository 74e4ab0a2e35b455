//! Per-scope overlay records
//!
//! An overlay is keyed by `(tenant, entity, location, channel)` and holds
//! exactly one [`ScopeState`]. A visibility overlay and a tombstone can
//! never coexist on one key because they are variants of the same enum.

use serde::{Deserialize, Serialize};

use super::catalog::EntityKind;
use super::scope::Channel;

/// State of one `(entity, location, channel)` scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScopeState {
    /// No record: the baseline default applies
    #[default]
    Baseline,
    /// Explicit visible/available flag for this scope
    Overlay { visible: bool },
    /// Hard exclusion
    Tombstone,
}

impl ScopeState {
    /// `tombstone > explicit overlay value > baseline(true)`
    pub fn resolves_visible(&self) -> bool {
        match self {
            ScopeState::Tombstone => false,
            ScopeState::Overlay { visible } => *visible,
            ScopeState::Baseline => true,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, ScopeState::Tombstone)
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, ScopeState::Baseline)
    }

    /// Column pair `(visible, removed)` used by the document/SQL stores
    pub fn to_columns(&self) -> (Option<bool>, bool) {
        match self {
            ScopeState::Baseline => (None, false),
            ScopeState::Overlay { visible } => (Some(*visible), false),
            ScopeState::Tombstone => (None, true),
        }
    }

    /// Inverse of [`ScopeState::to_columns`]; a tombstone wins over any flag
    pub fn from_columns(visible: Option<bool>, removed: bool) -> Self {
        if removed {
            return ScopeState::Tombstone;
        }
        match visible {
            Some(visible) => ScopeState::Overlay { visible },
            None => ScopeState::Baseline,
        }
    }
}

/// Unique overlay key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayKey {
    pub tenant_id: String,
    pub entity_id: i64,
    pub location_id: i64,
    pub channel: Channel,
}

impl OverlayKey {
    pub fn new(tenant_id: impl Into<String>, entity_id: i64, location_id: i64, channel: Channel) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            entity_id,
            location_id,
            channel,
        }
    }
}

/// Stored overlay; `state` is never [`ScopeState::Baseline`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRecord {
    #[serde(flatten)]
    pub key: OverlayKey,
    pub kind: EntityKind,
    #[serde(flatten)]
    pub state: ScopeState,
    pub updated_at: i64,
}
