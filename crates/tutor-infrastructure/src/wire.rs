//! Wire format of the tutoring backend.
//!
//! DTOs stay private to this crate. Persisted history is validated record by
//! record so a malformed transcript fails with a [`TutorError::HistoryLoad`]
//! naming the offending record instead of a generic decode error.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tutor_core::backend::{AssistantReply, SessionHandle};
use tutor_core::profile::{Profile, SessionSummary};
use tutor_core::{
    Contributor, MediaKind, MediaReference, RawTurn, Result, SegmentSource, TutorError,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NewSessionResponse {
    pub session_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<NewSessionResponse> for SessionHandle {
    fn from(response: NewSessionResponse) -> Self {
        SessionHandle {
            session_id: response.session_id,
            created_at: response.timestamp.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PromptRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonResponse {
    #[serde(default)]
    pub title: Option<String>,
    pub segments: Vec<WireSegment>,
    #[serde(default)]
    pub narration: Option<String>,
}

impl LessonResponse {
    pub fn into_reply(self, base_url: &str) -> AssistantReply {
        AssistantReply {
            title: self.title.filter(|title| !title.trim().is_empty()),
            segments: self
                .segments
                .into_iter()
                .map(|segment| segment.into_segment(base_url))
                .collect(),
            narration: self.narration,
        }
    }
}

/// One lesson segment as sent by the backend.
///
/// Pre-rendered diagram files (`diagram_path`, `diagram_url`) are ignored:
/// the client recompiles `mermaid` itself.
#[derive(Debug, Deserialize, Default)]
pub(crate) struct WireSegment {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mermaid: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl WireSegment {
    pub fn into_segment(self, base_url: &str) -> SegmentSource {
        let media_url = self
            .image_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                self.image_path
                    .filter(|path| !path.trim().is_empty())
                    .map(|path| resolve_asset_url(base_url, &path))
            });

        let media = media_url.map(|url| {
            let mut media = MediaReference::new(url, self.alt_text.clone());
            if self.kind.as_deref() == Some("video") {
                media.kind = MediaKind::Video;
            }
            media
        });

        SegmentSource {
            narrative: self.text,
            diagram_definition: self.mermaid,
            media,
            section: self.section.filter(|section| !section.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub session_ids: Vec<WireSessionSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSessionSummary {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<ProfileResponse> for Profile {
    fn from(response: ProfileResponse) -> Self {
        Profile {
            username: response.username,
            display_name: response.name,
            sessions: response
                .session_ids
                .into_iter()
                .map(|summary| SessionSummary {
                    created_at: summary.timestamp.as_deref().and_then(parse_timestamp),
                    id: summary.id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Value,
}

/// Extracts the `detail` message of an error body, falling back to the raw
/// body when it is not the expected shape.
pub(crate) fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorResponse { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Parses and validates a `GET /chat/{id}/messages` body.
pub(crate) fn parse_history(body: &str, base_url: &str) -> Result<Vec<RawTurn>> {
    let envelope: Value = serde_json::from_str(body)
        .map_err(|err| TutorError::history_load(format!("response is not valid JSON: {err}")))?;

    let records = envelope
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| TutorError::history_load("response has no 'messages' array"))?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, record, base_url))
        .collect()
}

fn parse_record(index: usize, record: &Value, base_url: &str) -> Result<RawTurn> {
    let invalid = |reason: String| TutorError::history_load(format!("record {index}: {reason}"));

    let fields = record
        .as_object()
        .ok_or_else(|| invalid("not an object".to_string()))?;

    let contributor = match fields.get("sender") {
        None | Some(Value::Null) => None,
        Some(Value::String(sender)) => Some(match sender.as_str() {
            "user" => Contributor::User,
            "model" | "assistant" => Contributor::Assistant,
            other => return Err(invalid(format!("unknown sender '{other}'"))),
        }),
        Some(other) => return Err(invalid(format!("sender is not a string: {other}"))),
    };

    let segment_values = fields
        .get("content")
        .and_then(|content| content.get("segments"))
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("content.segments is missing or not an array".to_string()))?;

    let segments = segment_values
        .iter()
        .enumerate()
        .map(|(position, value)| {
            WireSegment::deserialize(value)
                .map(|segment| segment.into_segment(base_url))
                .map_err(|err| invalid(format!("segment {position}: {err}")))
        })
        .collect::<Result<Vec<_>>>()?;

    if contributor == Some(Contributor::User) && segments.len() != 1 {
        return Err(invalid(format!(
            "user record must carry exactly one segment, found {}",
            segments.len()
        )));
    }

    Ok(RawTurn {
        contributor,
        segments,
        timestamp: fields
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Joins a backend-relative asset path onto the base URL.
pub(crate) fn resolve_asset_url(base_url: &str, path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.starts_with("http://") || path.starts_with("https://") {
        return path;
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Parses the timestamp shapes the backend emits (RFC 3339, or
/// space-separated with or without an offset; naive values are UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const BASE: &str = "http://localhost:8000";

    #[test]
    fn lesson_segment_maps_to_source() {
        let body = r#"{
            "title": "Queues",
            "segments": [{
                "section": "Intro",
                "kind": "content",
                "text": "A queue is FIFO.",
                "text_format": "md",
                "mermaid": "graph LR; A-->B",
                "diagram_path": "artifacts/x/diagram_0.png",
                "diagram_url": "http://localhost:8000/artifacts/x/diagram_0.png",
                "image_path": "artifacts\\x\\image_0.png",
                "alt_text": "people in line"
            }],
            "narration": null,
            "artifacts_root": "artifacts/x"
        }"#;

        let lesson: LessonResponse = serde_json::from_str(body).unwrap();
        let reply = lesson.into_reply(BASE);

        assert_eq!(reply.title.as_deref(), Some("Queues"));
        let segment = &reply.segments[0];
        assert_eq!(segment.narrative, "A queue is FIFO.");
        assert_eq!(segment.diagram(), Some("graph LR; A-->B"));
        assert_eq!(segment.section.as_deref(), Some("Intro"));
        let media = segment.media.as_ref().unwrap();
        assert_eq!(media.url, "http://localhost:8000/artifacts/x/image_0.png");
        assert_eq!(media.alt_text.as_deref(), Some("people in line"));
        assert_eq!(media.kind, MediaKind::Image);
    }

    #[test]
    fn history_with_sender_tags() {
        let body = r#"{"messages": [
            {"sender": "user", "content": {"segments": [{"text": "what is a queue?"}]},
             "timestamp": "2024-05-01 10:00:00.123456"},
            {"sender": "model",
             "content": {"title": "Q", "segments": [{"text": "FIFO", "mermaid": "graph LR"}]},
             "timestamp": "2024-05-01 10:00:05"}
        ]}"#;

        let turns = parse_history(body, BASE).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].contributor, Some(Contributor::User));
        assert_eq!(turns[1].contributor, Some(Contributor::Assistant));
        assert_eq!(turns[1].segments[0].diagram(), Some("graph LR"));
        assert_eq!(turns[0].timestamp.as_deref(), Some("2024-05-01 10:00:00.123456"));
    }

    #[test]
    fn history_without_sender_is_untagged() {
        let body = r#"{"messages": [{"content": {"segments": [{"text": "hi"}]}}]}"#;
        let turns = parse_history(body, BASE).unwrap();
        assert_eq!(turns[0].contributor, None);
    }

    #[test]
    fn history_validation_errors_name_the_record() {
        let cases = [
            (r#"{"items": []}"#, "no 'messages' array"),
            (r#"{"messages": [42]}"#, "record 0: not an object"),
            (
                r#"{"messages": [{"content": {"segments": [{"text": "a"}]}}, {"content": "video.mp4"}]}"#,
                "record 1: content.segments",
            ),
            (
                r#"{"messages": [{"sender": "bot", "content": {"segments": []}}]}"#,
                "unknown sender 'bot'",
            ),
            (
                r#"{"messages": [{"sender": "user", "content": {"segments": []}}]}"#,
                "exactly one segment",
            ),
            (
                r#"{"messages": [{"content": {"segments": [{"text": 7}]}}]}"#,
                "record 0: segment 0",
            ),
        ];

        for (body, expected) in cases {
            let err = parse_history(body, BASE).unwrap_err();
            assert!(err.is_history_load(), "{body}");
            assert!(err.to_string().contains(expected), "{body}: {err}");
        }
    }

    #[test]
    fn error_detail_shapes() {
        assert_eq!(
            error_detail(r#"{"detail": "Chat session not found"}"#),
            "Chat session not found"
        );
        assert!(
            error_detail(r#"{"detail": [{"msg": "field required"}]}"#).contains("field required")
        );
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_detail(""), "empty response body");
    }

    #[test]
    fn timestamp_formats() {
        let naive = parse_timestamp("2024-05-01 10:11:12.123456").unwrap();
        assert_eq!((naive.year(), naive.hour(), naive.second()), (2024, 10, 12));

        let offset = parse_timestamp("2024-05-01 10:11:12+02:00").unwrap();
        assert_eq!(offset.hour(), 8);

        assert!(parse_timestamp("2024-05-01T10:11:12Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn asset_urls() {
        assert_eq!(
            resolve_asset_url("http://h:8000/", "/artifacts/a.png"),
            "http://h:8000/artifacts/a.png"
        );
        assert_eq!(resolve_asset_url("http://h", "https://cdn/x.png"), "https://cdn/x.png");
    }

    #[test]
    fn profile_maps_sessions() {
        let body = r#"{"username": "ada", "name": "Ada",
            "session_ids": [{"id": "s-1", "timestamp": "2024-05-01 10:00:00"}]}"#;
        let profile: Profile = serde_json::from_str::<ProfileResponse>(body).unwrap().into();
        assert_eq!(profile.username.as_deref(), Some("ada"));
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(profile.sessions[0].id, "s-1");
        assert!(profile.sessions[0].created_at.is_some());
    }
}
