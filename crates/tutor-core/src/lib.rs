pub mod backend;
pub mod block;
pub mod config;
pub mod credential;
pub mod diagram;
pub mod error;
pub mod profile;
pub mod segment;
pub mod session;
pub mod turn;

// Re-export common types
pub use block::RenderBlock;
pub use credential::Credential;
pub use error::{CompileError, Result, TutorError};
pub use segment::{MediaKind, MediaReference, SegmentSource};
pub use session::{Session, SessionStatus};
pub use turn::{Contributor, RawTurn, Turn};
