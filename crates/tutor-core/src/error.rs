//! Error types for the tutor client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire tutor client.
///
/// Transport failures are split by the operation that produced them so the
/// session state machine can decide how to surface each one: creation and
/// history failures revert the session, send failures become an inline
/// failure turn.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TutorError {
    /// The backend refused or failed to open a new session.
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// A prompt could not be delivered or its reply could not be read.
    #[error("Message send failed: {0}")]
    MessageSend(String),

    /// The persisted transcript could not be fetched or is malformed.
    #[error("History load failed: {0}")]
    HistoryLoad(String),

    /// Another operation already holds the flight guard.
    #[error("Busy: '{operation}' rejected while '{session}' has an operation in flight")]
    Busy { operation: String, session: String },

    /// The operation is not permitted from the current session status.
    #[error("Invalid transition: '{operation}' is not allowed while {status}")]
    InvalidTransition { operation: String, status: String },

    /// Caller-supplied input was rejected before reaching the backend.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TutorError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn session_creation(message: impl Into<String>) -> Self {
        Self::SessionCreation(message.into())
    }

    pub fn message_send(message: impl Into<String>) -> Self {
        Self::MessageSend(message.into())
    }

    pub fn history_load(message: impl Into<String>) -> Self {
        Self::HistoryLoad(message.into())
    }

    /// Creates a Busy error for `operation` blocked by `session`.
    pub fn busy(operation: impl Into<String>, session: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
            session: session.into(),
        }
    }

    pub fn invalid_transition(operation: impl Into<String>, status: impl ToString) -> Self {
        Self::InvalidTransition {
            operation: operation.into(),
            status: status.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_session_creation(&self) -> bool {
        matches!(self, Self::SessionCreation(_))
    }

    pub fn is_message_send(&self) -> bool {
        matches!(self, Self::MessageSend(_))
    }

    pub fn is_history_load(&self) -> bool {
        matches!(self, Self::HistoryLoad(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true for failures that crossed the backend boundary.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::SessionCreation(_) | Self::MessageSend(_) | Self::HistoryLoad(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TutorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TutorError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for TutorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, TutorError>`.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Failure to compile a single diagram definition.
///
/// Kept apart from [`TutorError`] because it never aborts an operation:
/// the block assembler turns it into a failure block at the segment's
/// position and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
