//! User profile as reported by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prior session listed on the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Profile {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub sessions: Vec<SessionSummary>,
}

impl Profile {
    /// Sessions ordered newest first; undated entries sort last.
    pub fn sessions_newest_first(&self) -> Vec<SessionSummary> {
        let mut sessions = self.sessions.clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn newest_first_puts_undated_last() {
        let profile = Profile {
            username: Some("ada".into()),
            display_name: None,
            sessions: vec![
                SessionSummary {
                    id: "old".into(),
                    created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                },
                SessionSummary {
                    id: "undated".into(),
                    created_at: None,
                },
                SessionSummary {
                    id: "new".into(),
                    created_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                },
            ],
        };

        let ids: Vec<_> = profile
            .sessions_newest_first()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }
}
