//! pocketline CLI, the main entry point.
//!
//! Commands:
//! - `onboard`    initialize config and data directory
//! - `chat`       open a character's phone in an interactive session
//! - `character`  create, list, edit and delete characters
//! - `scenario`   manage a character's theater scenarios
//! - `settings`   API endpoint, key, model and persona
//! - `models`     list models offered by the configured endpoint
//! - `backup`     export or import all data as one JSON document
//! - `diary`      the user's own diary and characters' diaries
//! - `config`     show the process configuration

use clap::{Parser, Subcommand};

mod commands;

use commands::backup::BackupCommand;
use commands::character::CharacterCommand;
use commands::diary::DiaryCommand;
use commands::scenario::ScenarioCommand;
use commands::settings::SettingsCommand;

#[derive(Parser)]
#[command(
    name = "pocketline",
    about = "pocketline: a virtual phone for roleplay chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directory
    Onboard,

    /// Chat with a character
    Chat {
        /// Character id, id prefix or name
        character: String,
    },

    /// Manage characters
    Character {
        #[command(subcommand)]
        command: CharacterCommand,
    },

    /// Manage a character's theater scenarios
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommand,
    },

    /// Show or change in-app settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// List models offered by the configured endpoint
    Models,

    /// Export or import a full backup
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },

    /// Read and write diaries
    Diary {
        #[command(subcommand)]
        command: DiaryCommand,
    },

    /// Show the process configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing. Logs go to stderr so chat output stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { character } => commands::chat::run(&character).await?,
        Commands::Character { command } => commands::character::run(command).await?,
        Commands::Scenario { command } => commands::scenario::run(command).await?,
        Commands::Settings { command } => commands::settings::run(command).await?,
        Commands::Models => commands::models::run().await?,
        Commands::Backup { command } => commands::backup::run(command).await?,
        Commands::Diary { command } => commands::diary::run(command).await?,
        Commands::Config => commands::config_cmd::run().await?,
    }

    Ok(())
}
