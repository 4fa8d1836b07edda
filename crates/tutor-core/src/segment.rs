//! Source segments of an assistant reply.
//!
//! A reply arrives as an ordered list of [`SegmentSource`] values. Each one
//! pairs narrative prose with an optional diagram definition and an optional
//! pre-rendered media reference. Segments are immutable once produced by the
//! backend; rendering always derives new blocks from them.

use serde::{Deserialize, Serialize};

/// Kind of pre-rendered media a segment can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    /// Infers the kind from a URL's file extension.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if [".mp4", ".webm", ".mov", ".ogv"]
            .iter()
            .any(|ext| path.ends_with(ext))
        {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

/// A reference to media rendered ahead of time by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub kind: MediaKind,
}

impl MediaReference {
    pub fn new(url: impl Into<String>, alt_text: Option<String>) -> Self {
        let url = url.into();
        let kind = MediaKind::from_url(&url);
        Self {
            url,
            alt_text,
            kind,
        }
    }

    /// Display markup for this reference with attribute values escaped.
    pub fn to_markup(&self) -> String {
        let src = escape_html(&self.url);
        match self.kind {
            MediaKind::Image => {
                let alt = escape_html(self.alt_text.as_deref().unwrap_or(""));
                format!(r#"<img src="{src}" alt="{alt}" />"#)
            }
            MediaKind::Video => match self.alt_text.as_deref() {
                Some(alt) => format!(
                    r#"<video src="{src}" controls title="{}"></video>"#,
                    escape_html(alt)
                ),
                None => format!(r#"<video src="{src}" controls></video>"#),
            },
        }
    }
}

/// One unit of an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SegmentSource {
    #[serde(default)]
    pub narrative: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl SegmentSource {
    pub fn narrative(text: impl Into<String>) -> Self {
        Self {
            narrative: text.into(),
            ..Self::default()
        }
    }

    pub fn with_diagram(narrative: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            diagram_definition: Some(definition.into()),
            ..Self::default()
        }
    }

    pub fn with_media(mut self, media: MediaReference) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// The diagram definition, treating whitespace-only text as absent.
    pub fn diagram(&self) -> Option<&str> {
        self.diagram_definition
            .as_deref()
            .filter(|definition| !definition.trim().is_empty())
    }

    pub fn has_narrative(&self) -> bool {
        !self.narrative.trim().is_empty()
    }

    /// True when the segment carries nothing renderable at all.
    pub fn is_blank(&self) -> bool {
        !self.has_narrative() && self.diagram().is_none() && self.media.is_none()
    }
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
