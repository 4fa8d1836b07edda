//! Diagram engine trait.

use crate::error::CompileError;
use async_trait::async_trait;

/// The external diagram-rendering capability.
///
/// `render_id` is unique per call and should be embedded in the produced
/// markup (element ids, style scopes) so several diagrams can share one
/// document without colliding.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    async fn render(&self, render_id: &str, definition: &str) -> Result<String, CompileError>;
}
