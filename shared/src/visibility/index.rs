//! Overlay lookup index

use std::collections::HashMap;

use crate::models::{Channel, OverlayRecord, ScopeState};

/// Scope states keyed by `(entity, location, channel)`
///
/// Built per read from the overlay records of one tenant. A missing key
/// reads as [`ScopeState::Baseline`].
#[derive(Debug, Clone, Default)]
pub struct OverlayIndex {
    states: HashMap<(i64, i64, Channel), ScopeState>,
}

impl OverlayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a OverlayRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(
                record.key.entity_id,
                record.key.location_id,
                record.key.channel,
                record.state,
            );
        }
        index
    }

    /// Set a state; `Baseline` removes the entry
    pub fn insert(&mut self, entity_id: i64, location_id: i64, channel: Channel, state: ScopeState) {
        if state.is_baseline() {
            self.states.remove(&(entity_id, location_id, channel));
        } else {
            self.states.insert((entity_id, location_id, channel), state);
        }
    }

    pub fn state(&self, entity_id: i64, location_id: i64, channel: Channel) -> ScopeState {
        self.states
            .get(&(entity_id, location_id, channel))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
