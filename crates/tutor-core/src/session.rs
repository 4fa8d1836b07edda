//! Session model.

use crate::turn::Turn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level lifecycle status of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    NoSession,
    Creating,
    Active,
    LoadingHistory,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::NoSession => "no session",
            SessionStatus::Creating => "creating",
            SessionStatus::Active => "active",
            SessionStatus::LoadingHistory => "loading history",
        };
        f.write_str(label)
    }
}

/// One continuous conversation with a backend-issued identifier.
///
/// Values handed out to callers are snapshots; only the session manager
/// holds the authoritative copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    pub id: Option<String>,
    pub status: SessionStatus,
    pub turns: Vec<Turn>,
}

impl Session {
    /// The initial state: no id, no turns.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
