//! Mermaid diagram engine backed by the `mmdc` command line tool.
//!
//! Each render writes the definition to a private temp directory, runs
//! `mmdc -i <in> -o <out> -I <render id>` and returns the produced SVG
//! markup, or the PNG wrapped as a data-URI `<img>`.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tutor_core::CompileError;
use tutor_core::config::{DiagramConfig, DiagramFormat};
use tutor_core::diagram::DiagramEngine;

const MMDC_HINT: &str =
    "Mermaid CLI (mmdc) not found. Install with `npm i -g @mermaid-js/mermaid-cli` or set MERMAID_BIN";

static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE_REGEX.get_or_init(|| {
        Regex::new(r"(?i)```(?:mermaid)?\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
    })
}

/// Strips a surrounding markdown code fence, if any.
pub fn extract_definition(raw: &str) -> String {
    let trimmed = raw.trim();
    match fence_regex().captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Drops lines that commonly break across mermaid versions (`style`,
/// `classDef`) as well as blank lines and trailing whitespace.
pub fn sanitize_definition(definition: &str) -> String {
    definition
        .lines()
        .filter(|line| {
            let lower = line.trim().to_ascii_lowercase();
            !lower.is_empty() && !lower.starts_with("style ") && !lower.starts_with("classdef ")
        })
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct MermaidCliEngine {
    bin: String,
    theme: String,
    background: String,
    format: DiagramFormat,
    timeout: Duration,
    heal_on_failure: bool,
}

impl MermaidCliEngine {
    pub fn from_config(config: &DiagramConfig) -> Self {
        Self {
            bin: config.mermaid_bin.clone(),
            theme: config.theme.clone(),
            background: config.background.clone(),
            format: config.output_format,
            timeout: Duration::from_secs(config.timeout_secs),
            heal_on_failure: config.heal_on_failure,
        }
    }

    async fn run(&self, render_id: &str, definition: &str) -> Result<String, CompileError> {
        let workdir = tempfile::Builder::new()
            .prefix("tutor-mmdc-")
            .tempdir()
            .map_err(|err| CompileError::new(format!("failed to create temp dir: {err}")))?;
        let input = workdir.path().join("diagram.mmd");
        let output = workdir
            .path()
            .join(format!("diagram.{}", self.format.extension()));

        tokio::fs::write(&input, definition)
            .await
            .map_err(|err| CompileError::new(format!("failed to write diagram source: {err}")))?;

        let mut command = Command::new(&self.bin);
        command
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-t")
            .arg(&self.theme)
            .arg("-b")
            .arg(&self.background)
            .arg("-I")
            .arg(render_id)
            .arg("-q")
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                CompileError::new(format!(
                    "mermaid CLI timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?;

        let finished = match result {
            Ok(finished) => finished,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CompileError::new(MMDC_HINT));
            }
            Err(err) => {
                return Err(CompileError::new(format!("failed to run {}: {err}", self.bin)));
            }
        };

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(3)
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!("[MermaidCliEngine] {} exited with {}", render_id, finished.status);
            return Err(CompileError::new(if message.is_empty() {
                format!("mermaid CLI exited with {}", finished.status)
            } else {
                message
            }));
        }

        let bytes = tokio::fs::read(&output)
            .await
            .map_err(|err| CompileError::new(format!("mermaid CLI produced no output: {err}")))?;
        if bytes.is_empty() {
            return Err(CompileError::new("mermaid CLI produced an empty file"));
        }

        match self.format {
            DiagramFormat::Svg => String::from_utf8(bytes)
                .map_err(|err| CompileError::new(format!("SVG output is not UTF-8: {err}"))),
            DiagramFormat::Png => Ok(format!(
                r#"<img id="{render_id}" src="data:image/png;base64,{}" />"#,
                STANDARD.encode(bytes)
            )),
        }
    }
}

#[async_trait]
impl DiagramEngine for MermaidCliEngine {
    async fn render(&self, render_id: &str, definition: &str) -> Result<String, CompileError> {
        let source = extract_definition(definition);
        if source.is_empty() {
            return Err(CompileError::new("diagram definition is empty"));
        }

        match self.run(render_id, &source).await {
            Ok(markup) => Ok(markup),
            Err(err) if self.heal_on_failure => {
                let healed = sanitize_definition(&source);
                if healed == source || healed.is_empty() {
                    return Err(err);
                }
                tracing::debug!("[MermaidCliEngine] Retrying {} with sanitized source", render_id);
                // Report the original failure if the retry fails too.
                self.run(render_id, &healed).await.map_err(|_| err)
            }
            Err(err) => Err(err),
        }
    }
}
