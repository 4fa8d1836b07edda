//! Transcript reconstruction from persisted turns.
//!
//! The backend stores source segments only. Rebuilding a transcript means
//! attributing each record to a contributor and, for assistant records,
//! running the block assembler again. Diagrams are recompiled on every load.

use crate::assembler::BlockAssembler;
use std::sync::Arc;
use tutor_core::{Contributor, RawTurn, Result, Turn, TutorError};

/// How persisted records are attributed to contributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributionPolicy {
    /// Use a record's explicit contributor tag, falling back to parity.
    #[default]
    PreferExplicit,
    /// Ignore tags: even positions are user turns, odd are assistant turns.
    Parity,
}

pub struct TranscriptReconstructor {
    assembler: Arc<BlockAssembler>,
    policy: AttributionPolicy,
}

impl TranscriptReconstructor {
    pub fn new(assembler: Arc<BlockAssembler>) -> Self {
        Self {
            assembler,
            policy: AttributionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AttributionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn attribute(&self, index: usize, raw: &RawTurn) -> Contributor {
        match (self.policy, raw.contributor) {
            (AttributionPolicy::PreferExplicit, Some(contributor)) => contributor,
            _ => Contributor::from_parity(index),
        }
    }

    /// Rebuilds rendered turns from `raw_turns`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::HistoryLoad`] when a user record does not carry
    /// exactly one segment.
    pub async fn reconstruct(&self, raw_turns: &[RawTurn]) -> Result<Vec<Turn>> {
        let mut turns = Vec::with_capacity(raw_turns.len());

        for (index, raw) in raw_turns.iter().enumerate() {
            let turn = match self.attribute(index, raw) {
                Contributor::User => {
                    let [segment] = raw.segments.as_slice() else {
                        return Err(TutorError::history_load(format!(
                            "user turn {} must carry exactly one segment, found {}",
                            index,
                            raw.segments.len()
                        )));
                    };
                    Turn::user(segment.narrative.clone())
                }
                Contributor::Assistant => self.assembler.assemble_turn(&raw.segments).await,
            };
            turns.push(turn);
        }

        tracing::debug!("[TranscriptReconstructor] Rebuilt {} turns", turns.len());
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssemblyOptions;
    use crate::compiler::DiagramCompiler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tutor_core::diagram::DiagramEngine;
    use tutor_core::{CompileError, RenderBlock, SegmentSource};

    struct CountingEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DiagramEngine for CountingEngine {
        async fn render(
            &self,
            _render_id: &str,
            definition: &str,
        ) -> std::result::Result<String, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<svg>{definition}</svg>"))
        }
    }

    fn reconstructor(engine: Arc<CountingEngine>) -> TranscriptReconstructor {
        let assembler =
            BlockAssembler::new(DiagramCompiler::new(engine), AssemblyOptions::default());
        TranscriptReconstructor::new(Arc::new(assembler))
    }

    fn untagged_history() -> Vec<RawTurn> {
        vec![
            RawTurn::untagged(vec![SegmentSource::narrative("what is a queue?")]),
            RawTurn::untagged(vec![SegmentSource::with_diagram(
                "A queue is FIFO.",
                "graph LR; A-->B",
            )]),
            RawTurn::untagged(vec![SegmentSource::narrative("and a stack?")]),
            RawTurn::untagged(vec![SegmentSource::narrative("A stack is LIFO.")]),
        ]
    }

    #[tokio::test]
    async fn untagged_history_alternates_by_parity() {
        let engine = Arc::new(CountingEngine { calls: AtomicUsize::new(0) });
        let turns = reconstructor(engine).reconstruct(&untagged_history()).await.unwrap();

        let roles: Vec<_> = turns.iter().map(Turn::contributor).collect();
        assert_eq!(
            roles,
            vec![
                Contributor::User,
                Contributor::Assistant,
                Contributor::User,
                Contributor::Assistant
            ]
        );
        assert_eq!(turns[0].blocks(), &[RenderBlock::text("what is a queue?")]);
        assert_eq!(
            turns[1].blocks(),
            &[
                RenderBlock::text("A queue is FIFO."),
                RenderBlock::diagram("<svg>graph LR; A-->B</svg>"),
            ]
        );
    }

    #[tokio::test]
    async fn reconstruction_is_idempotent_and_recompiles() {
        let engine = Arc::new(CountingEngine { calls: AtomicUsize::new(0) });
        let reconstructor = reconstructor(engine.clone());
        let history = untagged_history();

        let first = reconstructor.reconstruct(&history).await.unwrap();
        let second = reconstructor.reconstruct(&history).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn explicit_tags_override_parity() {
        let engine = Arc::new(CountingEngine { calls: AtomicUsize::new(0) });
        let history = vec![
            RawTurn::tagged(
                Contributor::Assistant,
                vec![SegmentSource::narrative("Hi! I'm your tutor.")],
            ),
            RawTurn::tagged(Contributor::User, vec![SegmentSource::narrative("hello")]),
        ];

        let turns = reconstructor(engine.clone()).reconstruct(&history).await.unwrap();
        assert_eq!(turns[0].contributor(), Contributor::Assistant);
        assert_eq!(turns[1].contributor(), Contributor::User);

        let turns = reconstructor(engine)
            .with_policy(AttributionPolicy::Parity)
            .reconstruct(&history)
            .await
            .unwrap();
        assert_eq!(turns[0].contributor(), Contributor::User);
        assert_eq!(turns[1].contributor(), Contributor::Assistant);
    }

    #[tokio::test]
    async fn user_turn_with_many_segments_is_rejected() {
        let engine = Arc::new(CountingEngine { calls: AtomicUsize::new(0) });
        let history = vec![RawTurn::untagged(vec![
            SegmentSource::narrative("a"),
            SegmentSource::narrative("b"),
        ])];

        let err = reconstructor(engine).reconstruct(&history).await.unwrap_err();
        assert!(err.is_history_load());
        assert!(err.to_string().contains("user turn 0"));
    }

    #[tokio::test]
    async fn user_text_is_kept_verbatim() {
        let engine = Arc::new(CountingEngine { calls: AtomicUsize::new(0) });
        let history = vec![RawTurn::untagged(vec![SegmentSource::with_diagram(
            "  spaced  ",
            "graph ignored",
        )])];

        let turns = reconstructor(engine.clone()).reconstruct(&history).await.unwrap();
        assert_eq!(turns[0].blocks(), &[RenderBlock::text("  spaced  ")]);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }
}
