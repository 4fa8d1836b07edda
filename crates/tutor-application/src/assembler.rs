//! Block assembler.
//!
//! Turns an ordered list of [`SegmentSource`] values into an ordered list of
//! [`RenderBlock`] values. Diagram compilations run concurrently (bounded by
//! `max_concurrent_compiles`) but their outcomes are committed at the fixed
//! position of the segment that produced them, so the block order depends
//! only on the source order.

use crate::compiler::DiagramCompiler;
use futures::stream::{self, StreamExt};
use tutor_core::config::RenderingConfig;
use tutor_core::{CompileError, RenderBlock, SegmentSource, Turn};

pub const BLANK_SEGMENT_REASON: &str = "segment carries no content";
pub const EMPTY_REPLY_REASON: &str = "reply carried no segments";

/// Knobs for block assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Re-emit a segment's narrative after its diagram outcome.
    pub repeat_narrative_after_diagram: bool,
    pub max_concurrent_compiles: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self::from(&RenderingConfig::default())
    }
}

impl From<&RenderingConfig> for AssemblyOptions {
    fn from(config: &RenderingConfig) -> Self {
        Self {
            repeat_narrative_after_diagram: config.repeat_narrative_after_diagram,
            max_concurrent_compiles: config.max_concurrent_compiles,
        }
    }
}

pub struct BlockAssembler {
    compiler: DiagramCompiler,
    options: AssemblyOptions,
}

impl BlockAssembler {
    pub fn new(compiler: DiagramCompiler, options: AssemblyOptions) -> Self {
        Self { compiler, options }
    }

    pub fn options(&self) -> AssemblyOptions {
        self.options
    }

    /// Assembles blocks for `segments` in source order.
    ///
    /// Per segment, in order:
    /// 1. `Text` from the narrative when it is non-blank
    /// 2. `Diagram` or `Failure` for the diagram definition when present
    /// 3. `Text` again when narrative repetition is enabled and step 2 ran
    /// 4. `Media` for a pre-rendered media reference
    ///
    /// A segment with none of these yields a single `Failure`.
    pub async fn assemble(&self, segments: &[SegmentSource]) -> Vec<RenderBlock> {
        let limit = self.options.max_concurrent_compiles.max(1);
        tracing::debug!(
            "[BlockAssembler] Assembling {} segments (compile limit {})",
            segments.len(),
            limit
        );

        // Futures are built up front so the stream holds no borrowing
        // closure. `buffered` polls up to `limit` compilations at once and
        // yields results in input order.
        let pending: Vec<_> = segments
            .iter()
            .map(|segment| self.diagram_outcome(segment))
            .collect();
        let outcomes: Vec<Option<Result<String, CompileError>>> =
            stream::iter(pending).buffered(limit).collect().await;

        let mut blocks = Vec::with_capacity(segments.len() * 2);
        for (index, (segment, outcome)) in segments.iter().zip(outcomes).enumerate() {
            if segment.is_blank() {
                tracing::warn!("[BlockAssembler] Segment {} is blank", index);
                blocks.push(RenderBlock::failure(BLANK_SEGMENT_REASON));
                continue;
            }

            if segment.has_narrative() {
                blocks.push(RenderBlock::text(&segment.narrative));
            }

            if let Some(outcome) = outcome {
                match outcome {
                    Ok(markup) => blocks.push(RenderBlock::diagram(markup)),
                    Err(err) => {
                        tracing::warn!(
                            "[BlockAssembler] Diagram for segment {} failed: {}",
                            index,
                            err.message
                        );
                        blocks.push(RenderBlock::failure(err.message));
                    }
                }

                if self.options.repeat_narrative_after_diagram && segment.has_narrative() {
                    blocks.push(RenderBlock::text(&segment.narrative));
                }
            }

            if let Some(media) = &segment.media {
                blocks.push(RenderBlock::media(media.to_markup()));
            }
        }

        blocks
    }

    async fn diagram_outcome(
        &self,
        segment: &SegmentSource,
    ) -> Option<Result<String, CompileError>> {
        match segment.diagram() {
            Some(definition) => Some(self.compiler.compile(definition).await),
            None => None,
        }
    }

    /// Assembles a complete assistant turn.
    ///
    /// A reply without any segments still produces a turn, holding a single
    /// failure block, so the transcript keeps its user/assistant rhythm.
    pub async fn assemble_turn(&self, segments: &[SegmentSource]) -> Turn {
        if segments.is_empty() {
            return Turn::assistant_failure(EMPTY_REPLY_REASON);
        }
        Turn::assistant(self.assemble(segments).await)
    }
}
