//! Tutoring backend trait.
//!
//! Defines the interface the session manager uses to reach the remote
//! session/profile service.

use crate::credential::Credential;
use crate::error::Result;
use crate::profile::Profile;
use crate::segment::SegmentSource;
use crate::turn::RawTurn;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Identity of a freshly created backend session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// An assistant reply in source form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantReply {
    pub title: Option<String>,
    pub segments: Vec<SegmentSource>,
    pub narration: Option<String>,
}

/// An abstract client for the tutoring backend.
///
/// Every call receives the caller's [`Credential`] explicitly; implementations
/// must not hold ambient authentication state.
///
/// # Errors
///
/// Each operation fails with its own variant so callers can tell the
/// boundaries apart:
/// - `create_session` with [`TutorError::SessionCreation`](crate::TutorError::SessionCreation)
/// - `send_message` with [`TutorError::MessageSend`](crate::TutorError::MessageSend)
/// - `fetch_history` with [`TutorError::HistoryLoad`](crate::TutorError::HistoryLoad),
///   including when a persisted record is malformed
/// - `fetch_profile` with [`TutorError::HistoryLoad`](crate::TutorError::HistoryLoad)
#[async_trait]
pub trait TutorBackend: Send + Sync {
    /// Opens a new session and returns its backend-issued identifier.
    async fn create_session(&self, credential: &Credential) -> Result<SessionHandle>;

    /// Submits a prompt and returns the assistant's reply segments.
    async fn send_message(
        &self,
        credential: &Credential,
        session_id: &str,
        prompt: &str,
    ) -> Result<AssistantReply>;

    /// Fetches the persisted transcript of a session, oldest turn first.
    async fn fetch_history(&self, credential: &Credential, session_id: &str)
    -> Result<Vec<RawTurn>>;

    /// Fetches the user's profile, including prior session summaries.
    async fn fetch_profile(&self, credential: &Credential) -> Result<Profile>;
}
