//! Application layer for the tutor client.
//!
//! Hosts the rendering pipeline (diagram compiler adapter, block assembler,
//! transcript reconstructor) and the session state machine built on top of
//! it. Collaborators are injected through the traits in `tutor-core`.

pub mod assembler;
pub mod compiler;
pub mod guard;
pub mod manager;
pub mod reconstructor;

pub use assembler::{AssemblyOptions, BlockAssembler};
pub use compiler::DiagramCompiler;
pub use guard::{FlightGuard, FlightKey, FlightTicket};
pub use manager::SessionManager;
pub use reconstructor::{AttributionPolicy, TranscriptReconstructor};
