//! ArchTalk CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write the default config
//! - `chat`    — Talk to an NPC from the console
//! - `config`  — Show, locate or validate the configuration
//! - `doctor`  — Diagnose setup and backend health

use clap::{Parser, Subcommand};

mod commands;
mod console;

#[derive(Parser)]
#[command(
    name = "archtalk",
    about = "ArchTalk — AI NPC dialogue for Minecraft servers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Hold a conversation with an NPC from the console
    Chat {
        /// Name of the NPC to talk to
        #[arg(short, long, default_value = "Villager")]
        npc: String,

        /// Name to use for the simulated player
        #[arg(short, long, default_value = "Steve")]
        player: String,

        /// Ask the NPC to greet the player first
        #[arg(short, long)]
        greet: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Diagnose setup and backend health
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration and print warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // debug_mode in the config also turns on verbose logging
    let debug_mode = archtalk_config::AppConfig::load()
        .map(|c| c.debug_mode)
        .unwrap_or(false);
    let filter = if cli.verbose || debug_mode { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { npc, player, greet } => commands::chat::run(npc, player, greet).await?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
