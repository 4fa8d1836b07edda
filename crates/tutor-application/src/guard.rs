//! Single-flight guard for session operations.
//!
//! Lifecycle operations (create, load) are exclusive with everything else.
//! Prompt submissions are exclusive per session id. Claims are released when
//! the returned [`FlightTicket`] is dropped.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tutor_core::{Result, TutorError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightKey {
    Lifecycle,
    Session(String),
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightKey::Lifecycle => f.write_str("session lifecycle"),
            FlightKey::Session(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlightGuard {
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
}

impl FlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` for `operation`, or fails with [`TutorError::Busy`].
    pub fn claim(&self, operation: &str, key: FlightKey) -> Result<FlightTicket> {
        let mut in_flight = lock(&self.in_flight);

        let blocker = match &key {
            FlightKey::Lifecycle => in_flight.iter().next().cloned(),
            FlightKey::Session(_) => [FlightKey::Lifecycle, key.clone()]
                .into_iter()
                .find(|candidate| in_flight.contains(candidate)),
        };

        if let Some(blocker) = blocker {
            tracing::warn!("[FlightGuard] Rejected '{}': '{}' is in flight", operation, blocker);
            return Err(TutorError::busy(operation, blocker.to_string()));
        }

        in_flight.insert(key.clone());
        Ok(FlightTicket {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_idle(&self) -> bool {
        lock(&self.in_flight).is_empty()
    }
}

/// Proof of a claim; releases it on drop.
#[derive(Debug)]
pub struct FlightTicket {
    key: FlightKey,
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
}

impl Drop for FlightTicket {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

// The set holds no invariants a panicking holder could break.
fn lock(set: &Mutex<HashSet<FlightKey>>) -> MutexGuard<'_, HashSet<FlightKey>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_excludes_everything() {
        let guard = FlightGuard::new();
        let _ticket = guard.claim("load_session", FlightKey::Lifecycle).unwrap();

        assert!(guard.claim("request_new_session", FlightKey::Lifecycle).unwrap_err().is_busy());
        assert!(
            guard
                .claim("send_prompt", FlightKey::Session("a".into()))
                .unwrap_err()
                .is_busy()
        );
    }

    #[test]
    fn sessions_are_exclusive_per_id() {
        let guard = FlightGuard::new();
        let _a = guard.claim("send_prompt", FlightKey::Session("a".into())).unwrap();

        assert!(guard.claim("send_prompt", FlightKey::Session("a".into())).is_err());
        assert!(guard.claim("send_prompt", FlightKey::Session("b".into())).is_ok());
        assert!(guard.claim("load_session", FlightKey::Lifecycle).is_err());
    }

    #[test]
    fn dropping_ticket_releases_claim() {
        let guard = FlightGuard::new();
        {
            let _ticket = guard.claim("send_prompt", FlightKey::Session("a".into())).unwrap();
            assert!(!guard.is_idle());
        }
        assert!(guard.is_idle());
        assert!(guard.claim("load_session", FlightKey::Lifecycle).is_ok());
    }

    #[test]
    fn busy_error_names_blocker() {
        let guard = FlightGuard::new();
        let _ticket = guard.claim("send_prompt", FlightKey::Session("abc".into())).unwrap();
        let err = guard.claim("send_prompt", FlightKey::Session("abc".into())).unwrap_err();
        assert_eq!(err, TutorError::busy("send_prompt", "abc"));
    }
}
