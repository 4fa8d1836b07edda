//! Bearer credential passed explicitly into every backend call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An access token for the tutoring backend.
///
/// `Debug` never prints the token so credentials can travel through
/// structured logs safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.access_token
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let credential = Credential::new("s3cret");
        let printed = format!("{credential:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("redacted"));
        assert_eq!(credential.bearer(), "Bearer s3cret");
    }
}
