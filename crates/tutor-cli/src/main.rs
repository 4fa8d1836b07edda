use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use tutor_core::SegmentSource;

mod app;
mod logging;
mod render;
mod repl;

use app::{AppContext, GlobalOptions};
use render::{DiagramExporter, TurnPrinter};

#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "Terminal client for the AI tutor service", long_about = None)]
struct Cli {
    /// Directory holding config.toml and credentials.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Access token, taking priority over TUTOR_TOKEN and credentials.json
    #[arg(long, global = true)]
    token: Option<String>,

    /// Repeat a segment's narrative after its diagram
    #[arg(long, global = true)]
    repeat_narrative: bool,

    /// Mermaid CLI binary used to compile diagrams
    #[arg(long, global = true)]
    mermaid_bin: Option<String>,

    /// Where compiled diagrams are written (defaults to the config directory)
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Do not write compiled diagrams to disk
    #[arg(long, global = true)]
    no_export: bool,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (the default)
    Chat {
        /// Resume this session instead of starting fresh
        #[arg(long)]
        session: Option<String>,
    },
    /// List previous sessions, newest first
    Sessions,
    /// Create a new session and print its id
    New,
    /// Ask a single question and print the reply
    Ask {
        /// Session to continue; a new one is created when omitted
        #[arg(long)]
        session: Option<String>,
        prompt: String,
    },
    /// Print the transcript of a previous session
    Resume { session: String },
    /// Render segments from a local JSON file without contacting the backend
    Render { file: PathBuf },
}

/// Accepted layouts for `tutor render` input.
#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentFile {
    Bare(Vec<SegmentSource>),
    Wrapped { segments: Vec<SegmentSource> },
}

impl SegmentFile {
    fn into_segments(self) -> Vec<SegmentSource> {
        match self {
            SegmentFile::Bare(segments) | SegmentFile::Wrapped { segments } => segments,
        }
    }
}

fn read_segments(path: &Path) -> Result<Vec<SegmentSource>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: SegmentFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a segment list", path.display()))?;
    Ok(file.into_segments())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config_dir: cli.config_dir.clone(),
        backend_url: cli.backend_url.clone(),
        token: cli.token.clone(),
        repeat_narrative: cli.repeat_narrative,
        mermaid_bin: cli.mermaid_bin.clone(),
    };
    let context = AppContext::load(&options)?;

    let _log_guard = logging::init(
        &context.log_dir()?,
        &context.config.logging.level,
        cli.verbose,
    )?;
    tracing::info!("[Main] tutor {} starting", env!("CARGO_PKG_VERSION"));

    let exporter = if cli.no_export {
        None
    } else {
        let dir = match &cli.out_dir {
            Some(dir) => dir.clone(),
            None => context.paths.diagrams_dir()?,
        };
        Some(DiagramExporter::new(dir))
    };
    let mut printer = TurnPrinter::new(exporter);

    match cli.command.unwrap_or(Commands::Chat { session: None }) {
        Commands::Render { file } => {
            let segments = read_segments(&file)?;
            let turn = context.assembler().assemble_turn(&segments).await;
            printer.print_turn(&turn);
        }
        Commands::Chat { session } => {
            let manager = context.session_manager()?;
            repl::run(&manager, &mut printer, session.as_deref()).await?;
        }
        Commands::Sessions => {
            let manager = context.session_manager()?;
            repl::print_sessions(&manager).await?;
        }
        Commands::New => {
            let manager = context.session_manager()?;
            let id = manager.request_new_session().await?;
            println!("{id}");
        }
        Commands::Ask { session, prompt } => {
            let manager = context.session_manager()?;
            match session {
                Some(id) => {
                    manager.load_session(&id).await?;
                }
                None => {
                    let id = manager.request_new_session().await?;
                    eprintln!("{}", format!("Started session {id}").bright_green());
                }
            }
            let reply = manager.send_prompt(&prompt).await?;
            printer.print_turn(&reply);
            if reply.is_failure_only() {
                anyhow::bail!("the tutor did not answer");
            }
        }
        Commands::Resume { session } => {
            let manager = context.session_manager()?;
            repl::resume(&manager, &mut printer, &session).await?;
        }
    }

    Ok(())
}
