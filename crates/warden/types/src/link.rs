//! Network link state as seen by the node

use serde::{Deserialize, Serialize};
use std::fmt;

/// Last known state of the uplink to the authority server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LinkState {
    Up,
    #[default]
    Down,
}

impl LinkState {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            LinkState::Up
        } else {
            LinkState::Down
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, LinkState::Up)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Up => write!(f, "up"),
            LinkState::Down => write!(f, "down"),
        }
    }
}

/// Edge in the link state, reported once per transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStateChange {
    /// DOWN to UP. Triggers a ledger flush.
    Reconnected,
    /// UP to DOWN.
    Disconnected,
}

impl LinkStateChange {
    /// Edge between two states, if they differ.
    pub fn between(previous: LinkState, current: LinkState) -> Option<Self> {
        match (previous, current) {
            (LinkState::Down, LinkState::Up) => Some(LinkStateChange::Reconnected),
            (LinkState::Up, LinkState::Down) => Some(LinkStateChange::Disconnected),
            _ => None,
        }
    }
}
