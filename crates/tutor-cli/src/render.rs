//! Terminal presentation of turns.

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::OnceLock;
use tutor_core::{Contributor, RenderBlock, Turn};

pub const GREETING: &str = "Hi! I'm your AI tutor. What topic would you like to explore today?";

static VIEWBOX_REGEX: OnceLock<Regex> = OnceLock::new();

fn viewbox_regex() -> &'static Regex {
    VIEWBOX_REGEX.get_or_init(|| {
        Regex::new(r#"viewBox="\s*[-\d.]+[\s,]+[-\d.]+[\s,]+([\d.]+)[\s,]+([\d.]+)\s*""#)
            .expect("viewBox pattern is valid")
    })
}

/// One-line description of diagram markup, e.g. `[diagram 640x480]`.
pub fn diagram_summary(markup: &str) -> String {
    if let Some(caps) = viewbox_regex().captures(markup) {
        let dimension = |index: usize| {
            caps.get(index)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(|value| value.round() as u64)
        };
        if let (Some(width), Some(height)) = (dimension(1), dimension(2)) {
            return format!("[diagram {width}x{height}]");
        }
    }
    if markup.contains("data:image/png") {
        return "[diagram png]".to_string();
    }
    "[diagram]".to_string()
}

/// Writes diagram markup to files so it can be opened in a browser.
#[derive(Debug, Clone)]
pub struct DiagramExporter {
    dir: PathBuf,
}

impl DiagramExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `markup` to `diagram-NNN.<ext>`, taking the first index at or
    /// after `start` that no existing file uses. Returns the index taken.
    ///
    /// Files are created with `create_new`, so runs sharing a directory
    /// never overwrite each other's exports.
    pub fn export(&self, start: usize, markup: &str) -> Result<(usize, PathBuf)> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let extension = markup_extension(markup);
        let mut index = start.max(1);
        loop {
            let path = self.dir.join(format!("diagram-{index:03}.{extension}"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(markup.as_bytes())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    return Ok((index, path));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => index += 1,
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to create {}", path.display()));
                }
            }
        }
    }
}

fn markup_extension(markup: &str) -> &'static str {
    let head = markup.trim_start();
    if head.starts_with("<svg") || head.starts_with("<?xml") {
        "svg"
    } else {
        "html"
    }
}

/// Prints turns to stdout, exporting diagrams when an exporter is set.
pub struct TurnPrinter {
    exporter: Option<DiagramExporter>,
    next_index: usize,
}

impl TurnPrinter {
    pub fn new(exporter: Option<DiagramExporter>) -> Self {
        Self {
            exporter,
            next_index: 1,
        }
    }

    pub fn print_turn(&mut self, turn: &Turn) {
        match turn.contributor() {
            Contributor::User => println!("{}", "[you]".bright_cyan().bold()),
            Contributor::Assistant => println!("{}", "[tutor]".bright_magenta().bold()),
        }
        for block in turn.blocks() {
            self.print_block(turn.contributor(), block);
        }
        println!();
    }

    pub fn print_turns(&mut self, turns: &[Turn]) {
        for turn in turns {
            self.print_turn(turn);
        }
    }

    fn print_block(&mut self, contributor: Contributor, block: &RenderBlock) {
        match block {
            RenderBlock::Text { content } => {
                for line in content.lines() {
                    match contributor {
                        Contributor::User => println!("{}", line.bright_cyan()),
                        Contributor::Assistant => println!("{}", line.bright_blue()),
                    }
                }
            }
            RenderBlock::Diagram { markup } => {
                let summary = diagram_summary(markup);
                match self.export(markup) {
                    Some(Ok(path)) => println!(
                        "{} {}",
                        summary.green(),
                        path.display().to_string().bright_black()
                    ),
                    Some(Err(err)) => {
                        tracing::warn!("[TurnPrinter] Diagram export failed: {:#}", err);
                        println!("{} {}", summary.green(), format!("(export failed: {err})").red());
                    }
                    None => println!("{}", summary.green()),
                }
            }
            RenderBlock::Media { markup } => println!("{}", markup.bright_black()),
            RenderBlock::Failure { reason } => println!("{}", format!("⚠ {reason}").red()),
        }
    }

    fn export(&mut self, markup: &str) -> Option<Result<PathBuf>> {
        let exporter = self.exporter.as_ref()?;
        Some(exporter.export(self.next_index, markup).map(|(index, path)| {
            self.next_index = index + 1;
            path
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reads_viewbox() {
        let svg = r#"<svg id="diagram-1" viewBox="-8 -8 640.4 479.6" xmlns="http://www.w3.org/2000/svg"></svg>"#;
        assert_eq!(diagram_summary(svg), "[diagram 640x480]");
    }

    #[test]
    fn summary_falls_back_for_png_and_unknown() {
        assert_eq!(
            diagram_summary(r#"<img src="data:image/png;base64,AAAA" />"#),
            "[diagram png]"
        );
        assert_eq!(diagram_summary("<div>?</div>"), "[diagram]");
    }

    #[test]
    fn exporter_picks_extension_from_markup() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DiagramExporter::new(dir.path().join("out"));

        let (_, svg) = exporter.export(1, "<svg></svg>").unwrap();
        assert_eq!(svg.extension().unwrap(), "svg");

        let png = r#"<img src="data:image/png;base64,AA" />"#;
        let (_, html) = exporter.export(1, png).unwrap();
        assert_eq!(html.extension().unwrap(), "html");
        assert_eq!(std::fs::read_to_string(html).unwrap(), png);
    }

    #[test]
    fn printers_sharing_a_directory_keep_earlier_exports() {
        let dir = tempfile::tempdir().unwrap();
        let turn = |body: &str| {
            Turn::assistant(vec![RenderBlock::diagram(format!("<svg>{body}</svg>"))])
        };

        let mut first = TurnPrinter::new(Some(DiagramExporter::new(dir.path())));
        first.print_turn(&turn("FIRST"));
        let mut second = TurnPrinter::new(Some(DiagramExporter::new(dir.path())));
        second.print_turn(&turn("SECOND"));
        second.print_turn(&turn("THIRD"));

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("diagram-001.svg"), "<svg>FIRST</svg>");
        assert_eq!(read("diagram-002.svg"), "<svg>SECOND</svg>");
        assert_eq!(read("diagram-003.svg"), "<svg>THIRD</svg>");
    }
}
