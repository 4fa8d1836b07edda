//! Display-ready render blocks.

use serde::{Deserialize, Serialize};

/// One typed, display-ready unit derived from a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderBlock {
    /// Narrative prose, passed through untouched.
    Text { content: String },
    /// Markup produced by the diagram engine.
    Diagram { markup: String },
    /// Markup referencing pre-rendered media.
    Media { markup: String },
    /// A segment-local failure.
    Failure { reason: String },
}

impl RenderBlock {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn diagram(markup: impl Into<String>) -> Self {
        Self::Diagram {
            markup: markup.into(),
        }
    }

    pub fn media(markup: impl Into<String>) -> Self {
        Self::Media {
            markup: markup.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Short lowercase label for logs and terminal output.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Diagram { .. } => "diagram",
            Self::Media { .. } => "media",
            Self::Failure { .. } => "failure",
        }
    }
}
