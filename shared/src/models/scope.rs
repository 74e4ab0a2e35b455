//! Channel and scope primitives
//!
//! A request targets either all locations or one location, and either all
//! channels or one channel. An entity's base channel scope is an absolute
//! ceiling: overlays can never make it visible outside that scope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sales channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    DineIn,
    Online,
}

impl Channel {
    /// Every channel, in a stable order
    pub const ALL: [Channel; 2] = [Channel::DineIn, Channel::Online];

    /// The remaining channel
    pub fn other(self) -> Channel {
        match self {
            Channel::DineIn => Channel::Online,
            Channel::Online => Channel::DineIn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::DineIn => "dine-in",
            Channel::Online => "online",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dine-in" => Ok(Channel::DineIn),
            "online" => Ok(Channel::Online),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// Base channel scope of an entity: every channel, or exactly one
///
/// Serialized as `"all"`, `"dine-in"` or `"online"`. `"both"` is accepted
/// on input as an alias of `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ChannelScope {
    #[default]
    All,
    Only(Channel),
}

impl ChannelScope {
    /// Whether the ceiling allows the channel
    pub fn permits(&self, channel: Channel) -> bool {
        match self {
            ChannelScope::All => true,
            ChannelScope::Only(c) => *c == channel,
        }
    }

    /// Channels allowed by this scope
    pub fn channels(&self) -> Vec<Channel> {
        match self {
            ChannelScope::All => Channel::ALL.to_vec(),
            ChannelScope::Only(c) => vec![*c],
        }
    }

    /// Channels allowed by `self` but not by `next`
    pub fn removed_by(&self, next: ChannelScope) -> Vec<Channel> {
        self.channels()
            .into_iter()
            .filter(|c| !next.permits(*c))
            .collect()
    }

    /// True when `next` allows a channel that `self` does not
    pub fn widened_by(&self, next: ChannelScope) -> bool {
        next.channels().into_iter().any(|c| !self.permits(c))
    }

    /// True when two scopes share at least one channel
    pub fn overlaps(&self, other: ChannelScope) -> bool {
        self.channels().into_iter().any(|c| other.permits(c))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelScope::All => "all",
            ChannelScope::Only(c) => c.as_str(),
        }
    }
}

impl From<Option<Channel>> for ChannelScope {
    fn from(channel: Option<Channel>) -> Self {
        match channel {
            Some(c) => ChannelScope::Only(c),
            None => ChannelScope::All,
        }
    }
}

impl From<ChannelScope> for String {
    fn from(scope: ChannelScope) -> Self {
        scope.as_str().to_string()
    }
}

impl TryFrom<String> for ChannelScope {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "all" | "both" => Ok(ChannelScope::All),
            other => other.parse::<Channel>().map(ChannelScope::Only),
        }
    }
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location part of a read request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationFilter {
    /// Every location of the tenant (existential view)
    All,
    /// One branch (local view)
    At(i64),
}

impl From<Option<i64>> for LocationFilter {
    fn from(location_id: Option<i64>) -> Self {
        match location_id {
            Some(id) => LocationFilter::At(id),
            None => LocationFilter::All,
        }
    }
}

/// Scope of a read request: location filter plus optional channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestScope {
    pub location: LocationFilter,
    /// `None` means all channels
    pub channel: Option<Channel>,
}

impl RequestScope {
    pub fn new(location_id: Option<i64>, channel: Option<Channel>) -> Self {
        Self {
            location: location_id.into(),
            channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serde() {
        assert_eq!(serde_json::to_string(&Channel::DineIn).unwrap(), "\"dine-in\"");
        let c: Channel = serde_json::from_str("\"online\"").unwrap();
        assert_eq!(c, Channel::Online);
        assert_eq!(Channel::DineIn.other(), Channel::Online);
    }

    #[test]
    fn test_channel_scope_accepts_both_alias() {
        let scope: ChannelScope = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(scope, ChannelScope::All);
        let scope: ChannelScope = serde_json::from_str("\"online\"").unwrap();
        assert_eq!(scope, ChannelScope::Only(Channel::Online));
        assert_eq!(serde_json::to_string(&ChannelScope::All).unwrap(), "\"all\"");
        assert!(serde_json::from_str::<ChannelScope>("\"delivery\"").is_err());
    }

    #[test]
    fn test_channel_scope_ceiling() {
        let online = ChannelScope::Only(Channel::Online);
        assert!(online.permits(Channel::Online));
        assert!(!online.permits(Channel::DineIn));
        assert!(ChannelScope::All.permits(Channel::DineIn));
        assert_eq!(ChannelScope::All.removed_by(online), vec![Channel::DineIn]);
        assert!(online.widened_by(ChannelScope::All));
        assert!(online.widened_by(ChannelScope::Only(Channel::DineIn)));
        assert!(!ChannelScope::All.widened_by(online));
        assert!(!online.overlaps(ChannelScope::Only(Channel::DineIn)));
    }
}
