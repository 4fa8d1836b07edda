use crate::assembler::BlockAssembler;
use crate::guard::{FlightGuard, FlightKey, FlightTicket};
use crate::reconstructor::{AttributionPolicy, TranscriptReconstructor};
use std::sync::Arc;
use tokio::sync::watch;
use tutor_core::backend::TutorBackend;
use tutor_core::profile::Profile;
use tutor_core::{Credential, Result, Session, SessionStatus, Turn, TutorError};

/// Drives the client session through its lifecycle.
///
/// `SessionManager` is responsible for:
/// - Creating new backend sessions
/// - Submitting prompts and assembling the assistant's reply
/// - Loading and reconstructing persisted transcripts
/// - Publishing every state change to subscribers
///
/// The three operations are the only mutators of the [`Session`]. Callers
/// observe it through [`snapshot`](Self::snapshot) or
/// [`subscribe`](Self::subscribe).
pub struct SessionManager {
    backend: Arc<dyn TutorBackend>,
    credential: Credential,
    assembler: Arc<BlockAssembler>,
    reconstructor: TranscriptReconstructor,
    guard: FlightGuard,
    state: watch::Sender<Session>,
}

impl SessionManager {
    /// Creates a manager in the `NoSession` state.
    ///
    /// # Arguments
    ///
    /// * `backend` - The tutoring backend client
    /// * `assembler` - Block assembler shared with transcript reconstruction
    /// * `credential` - Credential threaded into every backend call
    pub fn new(
        backend: Arc<dyn TutorBackend>,
        assembler: Arc<BlockAssembler>,
        credential: Credential,
    ) -> Self {
        let (state, _) = watch::channel(Session::none());
        Self {
            backend,
            credential,
            reconstructor: TranscriptReconstructor::new(Arc::clone(&assembler)),
            assembler,
            guard: FlightGuard::new(),
            state,
        }
    }

    pub fn with_attribution_policy(mut self, policy: AttributionPolicy) -> Self {
        self.reconstructor =
            TranscriptReconstructor::new(Arc::clone(&self.assembler)).with_policy(policy);
        self
    }

    /// Returns a copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn session_id(&self) -> Option<String> {
        self.state.borrow().id.clone()
    }

    /// Read-only view that is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Opens a new backend session.
    ///
    /// Valid from `NoSession` or `Active`. On success the session is
    /// `Active` with the returned id and no turns; on failure it reverts to
    /// `NoSession`. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`TutorError::Busy`] if another operation is in flight
    /// - [`TutorError::InvalidTransition`] from `Creating` or `LoadingHistory`
    /// - [`TutorError::SessionCreation`] if the backend call fails
    pub async fn request_new_session(&self) -> Result<String> {
        const OPERATION: &str = "request_new_session";
        let _ticket = self.guard.claim(OPERATION, FlightKey::Lifecycle)?;

        let status = self.status();
        if !matches!(status, SessionStatus::NoSession | SessionStatus::Active) {
            return Err(TutorError::invalid_transition(OPERATION, status));
        }

        self.replace(Session {
            id: None,
            status: SessionStatus::Creating,
            turns: Vec::new(),
        });
        tracing::info!("[SessionManager] Creating session");

        match self.backend.create_session(&self.credential).await {
            Ok(handle) => {
                tracing::info!("[SessionManager] Session {} is active", handle.session_id);
                self.replace(Session {
                    id: Some(handle.session_id.clone()),
                    status: SessionStatus::Active,
                    turns: Vec::new(),
                });
                Ok(handle.session_id)
            }
            Err(err) => {
                tracing::error!("[SessionManager] Session creation failed: {}", err);
                self.replace(Session::none());
                Err(err)
            }
        }
    }

    /// Submits a prompt to the active session.
    ///
    /// The user turn is appended before the backend is contacted. The
    /// returned assistant turn is appended as well; when the backend fails
    /// it holds a single failure block instead of an error being returned.
    ///
    /// # Errors
    ///
    /// - [`TutorError::InvalidInput`] for a blank prompt
    /// - [`TutorError::InvalidTransition`] unless the session is `Active`
    /// - [`TutorError::Busy`] if the session has a prompt in flight or a
    ///   lifecycle operation is running
    pub async fn send_prompt(&self, text: &str) -> Result<Turn> {
        const OPERATION: &str = "send_prompt";
        if text.trim().is_empty() {
            return Err(TutorError::invalid_input("prompt is empty"));
        }

        let session_id = self.active_session_id(OPERATION)?;
        let _ticket = self.claim_session(OPERATION, &session_id)?;

        self.append_turn(&session_id, Turn::user(text));
        tracing::info!("[SessionManager] Sending prompt to {}", session_id);

        let reply = match self
            .backend
            .send_message(&self.credential, &session_id, text)
            .await
        {
            Ok(reply) => {
                tracing::debug!(
                    "[SessionManager] Reply for {} carried {} segments",
                    session_id,
                    reply.segments.len()
                );
                self.assembler.assemble_turn(&reply.segments).await
            }
            Err(err) => {
                tracing::error!("[SessionManager] Message send failed: {}", err);
                Turn::assistant_failure(err.to_string())
            }
        };

        self.append_turn(&session_id, reply.clone());
        Ok(reply)
    }

    /// Replaces the transcript with the persisted history of `session_id`.
    ///
    /// Valid from any state. The previous transcript stays visible while the
    /// history loads. Returns the number of reconstructed turns.
    ///
    /// # Errors
    ///
    /// - [`TutorError::InvalidInput`] for a blank id
    /// - [`TutorError::Busy`] if another operation is in flight
    /// - [`TutorError::HistoryLoad`] if fetching or reconstructing fails; the
    ///   session is then `NoSession` with no turns
    pub async fn load_session(&self, session_id: &str) -> Result<usize> {
        const OPERATION: &str = "load_session";
        if session_id.trim().is_empty() {
            return Err(TutorError::invalid_input("session id is empty"));
        }
        let _ticket = self.guard.claim(OPERATION, FlightKey::Lifecycle)?;

        self.state.send_modify(|session| session.status = SessionStatus::LoadingHistory);
        tracing::info!("[SessionManager] Loading history of {}", session_id);

        let loaded = async {
            let raw_turns = self
                .backend
                .fetch_history(&self.credential, session_id)
                .await?;
            self.reconstructor.reconstruct(&raw_turns).await
        }
        .await;

        match loaded {
            Ok(turns) => {
                let count = turns.len();
                self.replace(Session {
                    id: Some(session_id.to_string()),
                    status: SessionStatus::Active,
                    turns,
                });
                tracing::info!(
                    "[SessionManager] Session {} is active with {} turns",
                    session_id,
                    count
                );
                Ok(count)
            }
            Err(err) => {
                tracing::error!("[SessionManager] History load failed for {}: {}", session_id, err);
                self.replace(Session::none());
                Err(err)
            }
        }
    }

    /// Fetches the profile, including prior sessions. Does not touch state.
    pub async fn list_sessions(&self) -> Result<Profile> {
        self.backend.fetch_profile(&self.credential).await
    }

    fn active_session_id(&self, operation: &str) -> Result<String> {
        let session = self.state.borrow();
        match (&session.id, session.status) {
            (Some(id), SessionStatus::Active) => Ok(id.clone()),
            _ => Err(TutorError::invalid_transition(operation, session.status)),
        }
    }

    /// Claims `session_id` and confirms it is still the active session.
    ///
    /// A lifecycle operation can complete between reading the id and the
    /// claim. Once the ticket is held no new one can start.
    fn claim_session(&self, operation: &str, session_id: &str) -> Result<FlightTicket> {
        let ticket = self
            .guard
            .claim(operation, FlightKey::Session(session_id.to_string()))?;
        if self.active_session_id(operation)? != session_id {
            return Err(TutorError::invalid_transition(operation, "session changed"));
        }
        Ok(ticket)
    }

    fn replace(&self, session: Session) {
        self.state.send_replace(session);
    }

    fn append_turn(&self, session_id: &str, turn: Turn) {
        self.state.send_if_modified(|session| {
            if session.id.as_deref() != Some(session_id) {
                tracing::warn!(
                    "[SessionManager] Dropping turn for {}: session changed",
                    session_id
                );
                return false;
            }
            session.turns.push(turn);
            true
        });
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
