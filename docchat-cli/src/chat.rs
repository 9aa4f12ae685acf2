//! Interactive terminal chat over a [`SessionStore`].
//!
//! The terminal is a pure renderer: it turns input lines into store commands
//! and prints whatever the published snapshots contain. It never writes to
//! the conversation itself.

use docchat::error::SessionError;
use docchat::session::{Message, Role, SessionState, SessionStore};
use docchat::transport::DocumentFile;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Shown when a question is typed before any upload.
pub const NO_DOCUMENT_HINT: &str = "Upload a document to start chatting (/upload PATH)";

/// Chat configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Prompt string to display before user input.
    pub prompt: String,
    /// Whether to print the user's own questions back from the log.
    pub echo_input: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            echo_input: false,
        }
    }
}

impl ChatConfig {
    /// Create a new chat config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prompt string.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set whether to echo user input.
    #[must_use]
    pub const fn echo_input(mut self, echo: bool) -> Self {
        self.echo_input = echo;
        self
    }
}

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/upload PATH`; `None` when no path was given.
    Upload(Option<String>),
    /// `/status`
    Status,
    /// `/help`
    Help,
    /// `/quit`, `exit` or `quit`.
    Quit,
    /// Any other non-empty line.
    Ask(String),
    /// Blank line.
    Empty,
}

impl ChatCommand {
    /// Parse one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }

        let (head, rest) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(h, r)| (h, r.trim()));

        match head {
            "/upload" => Self::Upload((!rest.is_empty()).then(|| rest.to_string())),
            "/status" => Self::Status,
            "/help" => Self::Help,
            "/quit" | "exit" | "quit" if rest.is_empty() => Self::Quit,
            _ => Self::Ask(trimmed.to_string()),
        }
    }
}

/// Turns successive snapshots into terminal lines.
///
/// Each message is rendered exactly once, in sequence order, however many
/// versions are skipped between two renders.
#[derive(Debug, Default)]
pub struct Renderer {
    next_sequence: u64,
    was_busy: bool,
    echo_input: bool,
}

impl Renderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new(echo_input: bool) -> Self {
        Self {
            next_sequence: 0,
            was_busy: false,
            echo_input,
        }
    }

    /// Lines to print for `state`, given everything rendered so far.
    pub fn render(&mut self, state: &SessionState) -> Vec<String> {
        let mut lines: Vec<String> = state
            .messages_since(self.next_sequence)
            .iter()
            .filter(|msg| self.echo_input || msg.role() != Role::User)
            .map(format_message)
            .collect();

        if let Some(last) = state.last_message() {
            self.next_sequence = last.sequence() + 1;
        }

        if state.busy() && !self.was_busy {
            lines.push("Sending...".to_string());
        }
        self.was_busy = state.busy();

        lines
    }
}

/// Format a single message for the terminal.
#[must_use]
pub fn format_message(msg: &Message) -> String {
    match msg.role() {
        Role::User => format!("You: {}", msg.text()),
        Role::Assistant => format!("AI: {}", msg.text()),
        Role::System => format!("* {}", msg.text()),
    }
}

/// One-line description of the document and busy state.
#[must_use]
pub fn status_line(state: &SessionState) -> String {
    let document = state.document().map_or_else(
        || "No file selected".to_string(),
        |doc| format!("Uploaded {} ({})", doc.display_name(), doc.file_id()),
    );
    if state.busy() {
        format!("{document} | waiting for the server")
    } else {
        document
    }
}

/// Text shown for a rejected command.
#[must_use]
pub const fn rejection_hint(err: SessionError) -> Option<&'static str> {
    match err {
        SessionError::Busy => Some("Still waiting for the previous request."),
        SessionError::NoActiveDocument => Some(NO_DOCUMENT_HINT),
        SessionError::MissingFile => Some("usage: /upload PATH"),
        SessionError::EmptyInput => None,
    }
}

const HELP: &str = "\
Commands:
  /upload PATH   upload a document (replaces the current one)
  /status        show the active document
  /help          show this help
  /quit          leave
Anything else is sent as a question about the uploaded document.";

/// Run an interactive session until stdin closes or the user quits.
///
/// Commands run as background tasks so the renderer keeps drawing while a
/// request is in flight; input typed meanwhile reaches the store and is
/// rejected as busy.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or stdout cannot be written.
#[allow(clippy::print_stdout)] // interactive chat intentionally prints to stdout
pub async fn run_interactive(store: Arc<SessionStore>, config: ChatConfig) -> io::Result<()> {
    let mut renderer = Renderer::new(config.echo_input);
    let mut updates = store.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Docchat | /help for commands, /quit to leave");
    let initial = Arc::clone(&updates.borrow_and_update());
    for line in renderer.render(&initial) {
        println!("{line}");
    }
    println!("{}", status_line(&initial));
    print_prompt(&config.prompt)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ChatCommand::parse(&line) {
                    ChatCommand::Quit => break,
                    ChatCommand::Empty => print_prompt(&config.prompt)?,
                    ChatCommand::Help => {
                        println!("{HELP}");
                        print_prompt(&config.prompt)?;
                    }
                    ChatCommand::Status => {
                        println!("{}", status_line(&store.snapshot()));
                        print_prompt(&config.prompt)?;
                    }
                    command => {
                        dispatch(Arc::clone(&store), command, config.prompt.clone());
                    }
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = Arc::clone(&updates.borrow_and_update());
                for line in renderer.render(&state) {
                    println!("{line}");
                }
                if !state.busy() {
                    print_prompt(&config.prompt)?;
                }
            }
        }
    }

    debug!("interactive session finished");
    Ok(())
}

/// Run `command` against the store without blocking input.
#[allow(clippy::print_stdout)] // interactive chat intentionally prints to stdout
fn dispatch(store: Arc<SessionStore>, command: ChatCommand, prompt: String) {
    tokio::spawn(async move {
        let result = match command {
            ChatCommand::Upload(Some(path)) => match DocumentFile::from_path(&path).await {
                Ok(file) => store.upload_document(Some(file)).await,
                Err(e) => {
                    println!("* Could not read {path}: {e}");
                    reprompt(&mut io::stdout(), &prompt);
                    return;
                }
            },
            ChatCommand::Upload(None) => store.upload_document(None).await,
            ChatCommand::Ask(question) => store.ask_question(&question).await,
            _ => return,
        };

        if let Err(e) = result {
            if let Some(hint) = rejection_hint(e) {
                println!("{hint}");
            }
            reprompt(&mut io::stdout(), &prompt);
        }
    });
}

fn print_prompt(prompt: &str) -> io::Result<()> {
    write_prompt(&mut io::stdout(), prompt)
}

fn write_prompt(out: &mut impl Write, prompt: &str) -> io::Result<()> {
    write!(out, "{prompt}")?;
    out.flush()
}

/// Print the prompt from a background task, where there is no caller to
/// hand a write error to. Returns whether the prompt was written.
fn reprompt(out: &mut impl Write, prompt: &str) -> bool {
    match write_prompt(out, prompt) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "failed to print prompt");
            false
        }
    }
}
