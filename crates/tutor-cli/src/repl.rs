//! Interactive chat loop.

use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tutor_application::SessionManager;
use tutor_core::SessionStatus;

use crate::render::{GREETING, TurnPrinter};

const COMMANDS: &[&str] = &["/new", "/load", "/sessions", "/help", "/quit"];

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Prompt(String),
    NewSession,
    Load(String),
    Sessions,
    Help,
    Quit,
    Unknown(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplInput::Empty;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return ReplInput::Quit;
        }
        if !trimmed.starts_with('/') {
            return ReplInput::Prompt(trimmed.to_string());
        }

        let (command, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (trimmed, ""),
        };
        match command {
            "/new" => ReplInput::NewSession,
            "/load" if !argument.is_empty() => ReplInput::Load(argument.to_string()),
            "/sessions" => ReplInput::Sessions,
            "/help" => ReplInput::Help,
            "/quit" | "/exit" => ReplInput::Quit,
            other => ReplInput::Unknown(other.to_string()),
        }
    }
}

/// Completion, highlighting and hints for slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }

        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        self.commands
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}

fn print_help() {
    println!("{}", "Type a question to ask the tutor. Commands:".bright_black());
    println!("{}", "  /new            start a new session".bright_black());
    println!("{}", "  /load <id>      resume a previous session".bright_black());
    println!("{}", "  /sessions       list previous sessions".bright_black());
    println!("{}", "  /quit           exit".bright_black());
}

fn prompt_for(manager: &SessionManager) -> String {
    match (manager.status(), manager.session_id()) {
        (SessionStatus::Active, Some(id)) => {
            let short: String = id.chars().take(8).collect();
            format!("[{short}]>> ")
        }
        _ => ">> ".to_string(),
    }
}

pub async fn print_sessions(manager: &SessionManager) -> Result<()> {
    let profile = manager.list_sessions().await?;
    if let Some(name) = profile.display_name.as_ref().or(profile.username.as_ref()) {
        println!("{}", format!("Sessions of {name}:").bright_magenta());
    }

    let sessions = profile.sessions_newest_first();
    if sessions.is_empty() {
        println!("{}", "No previous sessions.".bright_black());
    }
    for summary in sessions {
        let created = summary
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        println!("  {}  {}", summary.id, created.bright_black());
    }
    Ok(())
}

/// Loads a session and prints its transcript.
pub async fn resume(
    manager: &SessionManager,
    printer: &mut TurnPrinter,
    session_id: &str,
) -> Result<()> {
    let count = manager.load_session(session_id).await?;
    println!("{}", format!("Resumed {session_id} ({count} turns)").bright_green());
    println!();
    printer.print_turns(&manager.snapshot().turns);
    Ok(())
}

async fn start_session(manager: &SessionManager) -> Result<()> {
    let id = manager.request_new_session().await?;
    println!("{}", format!("Started session {id}").bright_green());
    println!("{}\n", GREETING.bright_blue());
    Ok(())
}

async fn ask(manager: &SessionManager, printer: &mut TurnPrinter, prompt: &str) -> Result<()> {
    if manager.status() != SessionStatus::Active {
        let id = manager.request_new_session().await?;
        println!("{}", format!("Started session {id}").bright_green());
    }

    println!("{}", "Thinking...".bright_black());
    let reply = manager.send_prompt(prompt).await?;
    printer.print_turn(&reply);
    Ok(())
}

/// Runs the chat loop until the user quits.
pub async fn run(
    manager: &SessionManager,
    printer: &mut TurnPrinter,
    session_id: Option<&str>,
) -> Result<()> {
    let mut rl = Editor::<CliHelper, DefaultHistory>::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Tutor ===".bright_magenta().bold());
    println!("{}", "Type '/help' for commands or '/quit' to exit.".bright_black());
    println!();

    match session_id {
        Some(id) => {
            if let Err(err) = resume(manager, printer, id).await {
                eprintln!("{}", format!("Error: {err:#}").red());
            }
        }
        None => println!("{}\n", GREETING.bright_blue()),
    }

    loop {
        let line = match rl.readline(&prompt_for(manager)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        };

        let input = ReplInput::parse(&line);
        if input != ReplInput::Empty {
            let _ = rl.add_history_entry(line.trim());
        }

        let outcome: Result<()> = match input {
            ReplInput::Empty => continue,
            ReplInput::Quit => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            ReplInput::Help => {
                print_help();
                Ok(())
            }
            ReplInput::Unknown(command) => {
                println!("{}", format!("Unknown command {command}").bright_black());
                Ok(())
            }
            ReplInput::NewSession => start_session(manager).await,
            ReplInput::Load(id) => resume(manager, printer, &id).await,
            ReplInput::Sessions => print_sessions(manager).await,
            ReplInput::Prompt(prompt) => ask(manager, printer, &prompt).await,
        };

        if let Err(err) = outcome {
            tracing::warn!("[Repl] Command failed: {:#}", err);
            eprintln!("{}", format!("Error: {err:#}").red());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppContext, GlobalOptions};
    use tutor_core::TutorError;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            ReplInput::parse("  explain TCP handshakes "),
            ReplInput::Prompt("explain TCP handshakes".into())
        );
        assert_eq!(ReplInput::parse("   "), ReplInput::Empty);
    }

    #[test]
    fn slash_commands_are_recognised() {
        assert_eq!(ReplInput::parse("/new"), ReplInput::NewSession);
        assert_eq!(ReplInput::parse("/load  abc-123 "), ReplInput::Load("abc-123".into()));
        assert_eq!(ReplInput::parse("/sessions"), ReplInput::Sessions);
        assert_eq!(ReplInput::parse("/quit"), ReplInput::Quit);
        assert_eq!(ReplInput::parse("exit"), ReplInput::Quit);
    }

    #[test]
    fn load_without_id_and_unknown_commands() {
        assert_eq!(ReplInput::parse("/load"), ReplInput::Unknown("/load".into()));
        assert_eq!(ReplInput::parse("/plan x"), ReplInput::Unknown("/plan".into()));
    }

    #[tokio::test]
    async fn failed_new_session_surfaces_as_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = GlobalOptions {
            config_dir: Some(dir.path().to_path_buf()),
            backend_url: Some("http://127.0.0.1:1".into()),
            token: Some("token".into()),
            ..GlobalOptions::default()
        };
        let manager = AppContext::load(&options).unwrap().session_manager().unwrap();

        let err = start_session(&manager).await.unwrap_err();
        let cause = err.downcast_ref::<TutorError>().unwrap();
        assert!(cause.is_session_creation());
        assert_eq!(manager.status(), SessionStatus::NoSession);
    }

    #[test]
    fn hints_complete_command_prefixes() {
        let helper = CliHelper::new();
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        assert_eq!(helper.hint("/ses", 4, &ctx), Some("sions".to_string()));
        assert_eq!(helper.hint("/new", 4, &ctx), None);
        assert_eq!(helper.hint("hello", 5, &ctx), None);
    }
}
