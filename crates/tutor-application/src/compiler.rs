//! Diagram compiler adapter.
//!
//! Wraps a [`DiagramEngine`] behind a contract that never fails past its
//! boundary: engine errors and engine panics both come back as a
//! [`CompileError`].

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tutor_core::CompileError;
use tutor_core::diagram::DiagramEngine;
use uuid::Uuid;

/// Prefix of every render identifier handed to the engine.
pub const RENDER_ID_PREFIX: &str = "diagram-";

#[derive(Clone)]
pub struct DiagramCompiler {
    engine: Arc<dyn DiagramEngine>,
}

impl DiagramCompiler {
    pub fn new(engine: Arc<dyn DiagramEngine>) -> Self {
        Self { engine }
    }

    /// Compiles one definition into markup.
    ///
    /// A fresh render id is generated for every call, so compiling the same
    /// definition twice never produces colliding element ids.
    pub async fn compile(&self, definition: &str) -> Result<String, CompileError> {
        let render_id = next_render_id();
        tracing::debug!("[DiagramCompiler] Compiling {} ({} bytes)", render_id, definition.len());

        let outcome = AssertUnwindSafe(self.engine.render(&render_id, definition))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(markup)) if markup.trim().is_empty() => {
                Err(CompileError::new("diagram engine returned empty markup"))
            }
            Ok(Ok(markup)) => Ok(markup),
            Ok(Err(err)) => Err(err),
            Err(panic) => {
                let message = panic_message(&*panic);
                tracing::error!("[DiagramCompiler] Engine panicked on {}: {}", render_id, message);
                Err(CompileError::new(format!("diagram engine panicked: {message}")))
            }
        }
    }
}

fn next_render_id() -> String {
    format!("{}{}", RENDER_ID_PREFIX, Uuid::new_v4().simple())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
