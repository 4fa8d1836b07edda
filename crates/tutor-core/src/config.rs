//! Client configuration model.
//!
//! Every field has a default so a partial (or missing) `config.toml` still
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_MERMAID_BIN: &str = "mmdc";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub backend: BackendConfig,
    pub rendering: RenderingConfig,
    pub diagram: DiagramConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RenderingConfig {
    /// Re-emit a segment's narrative after its diagram outcome.
    pub repeat_narrative_after_diagram: bool,
    /// Upper bound on diagram compilations in flight per reply.
    pub max_concurrent_compiles: usize,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            repeat_narrative_after_diagram: false,
            max_concurrent_compiles: 4,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    #[default]
    Svg,
    Png,
}

impl DiagramFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DiagramFormat::Svg => "svg",
            DiagramFormat::Png => "png",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DiagramConfig {
    pub mermaid_bin: String,
    pub theme: String,
    pub background: String,
    pub output_format: DiagramFormat,
    pub timeout_secs: u64,
    /// Retry a failed render once with a sanitized definition.
    pub heal_on_failure: bool,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            mermaid_bin: DEFAULT_MERMAID_BIN.to_string(),
            theme: "neutral".to_string(),
            background: "white".to_string(),
            output_format: DiagramFormat::Svg,
            timeout_secs: 30,
            heal_on_failure: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Overrides the default `<config dir>/logs` location.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}
