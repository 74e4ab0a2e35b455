//! Derived "all" views from per-cell visibility
//!
//! A cache holding per-`(location, channel)` rows derives its aggregate rows
//! from them. Every input is `Some(visible)` when known or `None` when the
//! cell is not known locally.

use serde::{Deserialize, Serialize};

/// Derived state of an aggregate row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// At least one input is visible
    Visible,
    /// Every input is known and hidden
    Hidden,
    /// Not derivable locally; refetch
    Unknown,
}

impl Aggregate {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Aggregate::Visible => Some(true),
            Aggregate::Hidden => Some(false),
            Aggregate::Unknown => None,
        }
    }
}

/// Existential aggregation: visible if any input is visible, hidden only if
/// all inputs are known hidden. An empty input is `Hidden`.
pub fn aggregate_any<I>(states: I) -> Aggregate
where
    I: IntoIterator<Item = Option<bool>>,
{
    let mut unknown = false;
    for state in states {
        match state {
            Some(true) => return Aggregate::Visible,
            Some(false) => {}
            None => unknown = true,
        }
    }
    if unknown {
        Aggregate::Unknown
    } else {
        Aggregate::Hidden
    }
}

/// Two-channel form used for a location's "all channels" row
pub fn aggregate_channels(dine_in: Option<bool>, online: Option<bool>) -> Aggregate {
    aggregate_any([dine_in, online])
}
