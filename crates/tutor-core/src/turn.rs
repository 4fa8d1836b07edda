//! Conversation turns, rendered and persisted.

use crate::block::RenderBlock;
use crate::segment::SegmentSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contributor {
    User,
    Assistant,
}

impl Contributor {
    /// Positional attribution for untagged transcripts: even indices are
    /// user turns, odd indices are assistant turns.
    pub fn from_parity(index: usize) -> Self {
        if index % 2 == 0 {
            Contributor::User
        } else {
            Contributor::Assistant
        }
    }
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contributor::User => write!(f, "user"),
            Contributor::Assistant => write!(f, "assistant"),
        }
    }
}

/// One contributor's complete set of render blocks.
///
/// Turns are assembled once and never edited afterwards, so the fields are
/// read through accessors only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    contributor: Contributor,
    blocks: Vec<RenderBlock>,
}

impl Turn {
    /// A user turn: the prompt text as its single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            contributor: Contributor::User,
            blocks: vec![RenderBlock::text(text)],
        }
    }

    pub fn assistant(blocks: Vec<RenderBlock>) -> Self {
        Self {
            contributor: Contributor::Assistant,
            blocks,
        }
    }

    /// An assistant turn holding a single failure block.
    pub fn assistant_failure(reason: impl Into<String>) -> Self {
        Self::assistant(vec![RenderBlock::failure(reason)])
    }

    pub fn contributor(&self) -> Contributor {
        self.contributor
    }

    pub fn blocks(&self) -> &[RenderBlock] {
        &self.blocks
    }

    pub fn is_user(&self) -> bool {
        self.contributor == Contributor::User
    }

    /// True when every block of the turn is a failure.
    pub fn is_failure_only(&self) -> bool {
        !self.blocks.is_empty() && self.blocks.iter().all(RenderBlock::is_failure)
    }
}

/// A persisted turn as stored by the backend: source segments only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTurn {
    /// Explicit attribution when the record carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<Contributor>,
    pub segments: Vec<SegmentSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl RawTurn {
    pub fn untagged(segments: Vec<SegmentSource>) -> Self {
        Self {
            contributor: None,
            segments,
            timestamp: None,
        }
    }

    pub fn tagged(contributor: Contributor, segments: Vec<SegmentSource>) -> Self {
        Self {
            contributor: Some(contributor),
            segments,
            timestamp: None,
        }
    }
}
