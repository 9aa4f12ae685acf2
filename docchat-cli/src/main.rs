//! Docchat CLI - ask questions about a document from the terminal.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use docchat::config::{self, ClientConfig};
use docchat::prelude::*;
use docchat_cli::chat::{self, ChatConfig, Renderer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Docchat - chat with a single uploaded document
#[derive(Parser)]
#[command(name = "docchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "DOCCHAT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Service base URL (overrides config and DOCCHAT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat(ChatArgs),

    /// Upload a document, ask one question and print the answer
    Ask(AskArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the chat command
#[derive(Args)]
struct ChatArgs {
    /// Document to upload before the first prompt
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Custom prompt
    #[arg(short, long, default_value = "> ")]
    prompt: String,
}

/// Arguments for the ask command
#[derive(Args)]
struct AskArgs {
    /// Document to ask about
    #[arg(short, long)]
    file: PathBuf,

    /// The question
    question: String,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Show configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Chat(ref args) => cmd_chat(args, &cli).await,
        Commands::Ask(ref args) => cmd_ask(args, &cli).await,
        Commands::Config(ref args) => cmd_config(args, &cli).await,
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "docchat={level},docchat_cli={level},{}",
            if verbosity >= 3 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

fn config_file(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(config::config_path)
}

/// Load the configuration file and apply command-line overrides.
async fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let path = config_file(cli);
    let loaded = match cli.config {
        Some(ref path) => config::load_config_from(path).await,
        None => config::load_config().await,
    };
    let mut client_config =
        loaded.with_context(|| format!("failed to load config from {}", path.display()))?;

    client_config = client_config.with_env_overrides();
    if let Some(ref base_url) = cli.base_url {
        client_config = client_config.with_base_url(base_url);
    }

    client_config.validate()?;
    Ok(client_config)
}

async fn open_session(cli: &Cli) -> anyhow::Result<Arc<SessionStore>> {
    let client_config = resolve_config(cli).await?;
    tracing::info!(base_url = %client_config.base_url, "using service");
    let gateway = HttpGateway::new(&client_config)?;
    Ok(Arc::new(SessionStore::new(gateway)))
}

/// Start interactive chat.
async fn cmd_chat(args: &ChatArgs, cli: &Cli) -> anyhow::Result<()> {
    let store = open_session(cli).await?;

    if let Some(ref path) = args.file {
        let file = DocumentFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        store.upload_document(Some(file)).await?;
    }

    let chat_config = ChatConfig::new().prompt(args.prompt.clone());
    chat::run_interactive(store, chat_config).await?;
    Ok(())
}

/// Upload, ask a single question, print the conversation.
async fn cmd_ask(args: &AskArgs, cli: &Cli) -> anyhow::Result<()> {
    let store = open_session(cli).await?;
    let mut renderer = Renderer::new(true);

    let file = DocumentFile::from_path(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    store.upload_document(Some(file)).await?;

    if store.document().is_none() {
        for line in renderer.render(&store.snapshot()) {
            println!("{line}");
        }
        bail!("upload failed");
    }

    let reply = store.ask_question(&args.question).await?;
    for line in renderer.render(&store.snapshot()) {
        println!("{line}");
    }

    if reply.role() != Role::Assistant {
        bail!("no answer received");
    }
    Ok(())
}

/// Configuration management.
async fn cmd_config(args: &ConfigArgs, cli: &Cli) -> anyhow::Result<()> {
    let path = config_file(cli);

    match args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let client_config = resolve_config(cli).await?;
            println!("{}", serde_json::to_string_pretty(&client_config)?);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                println!("Configuration already exists at: {}", path.display());
                println!("Use --force to overwrite.");
                return Ok(());
            }
            config::init_config(&path)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Configuration created: {}", path.display());
        }
    }

    Ok(())
}
