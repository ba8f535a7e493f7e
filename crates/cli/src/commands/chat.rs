//! `archtalk chat` — Talk to an NPC from the console.
//!
//! Stdin lines are chat messages from a simulated player standing next to
//! the NPC. Lines starting with `/` are commands.

use std::sync::Arc;

use archtalk_config::AppConfig;
use archtalk_core::event::DialogueEvent;
use archtalk_dialogue::{ConversationOrchestrator, MainThread, MessageOutcome};
use archtalk_memory::FileArchive;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::console::{ConsolePresentation, ConsoleSink, ConsoleWorld};

pub async fn run(
    npc_name: String,
    player_name: String,
    greet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.use_mcp && !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: Direct mode needs an API key!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ARCHTALK_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'");
        eprintln!();
        eprintln!("  Or switch to gateway mode (use_mcp = true) in:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let backend = archtalk_providers::build_from_config(&config)?;
    let mode = backend.mode().to_string();
    let main = MainThread::spawn("archtalk-main")?;
    let world = Arc::new(ConsoleWorld::new(&player_name, &npc_name));
    let player = world.player_id();
    let npc = world.npc_ref();
    let archive = Arc::new(FileArchive::new(FileArchive::default_path()));

    let orchestrator = ConversationOrchestrator::builder(
        config,
        world,
        backend,
        Arc::new(ConsoleSink::default()),
        main.clone(),
    )
    .with_presentation(Arc::new(ConsolePresentation))
    .with_archive(archive.clone())
    .build()?;

    let mut events = orchestrator.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DialogueEvent::ConversationEnded { reason, .. } = event.as_ref() {
                debug!(?reason, "Conversation ended event");
            }
        }
    });

    println!();
    println!("  ArchTalk — Console Conversation");
    println!("  ===============================");
    println!();
    println!("  NPC:      {}", npc.name);
    println!("  Player:   {player_name}");
    println!("  Backend:  {mode}");
    println!("  Archive:  {}", archive.path().display());
    println!();
    println!("  Commands: /greet  /start  /purge  /quit");
    println!();

    if greet {
        orchestrator.greet(player, npc.clone()).await?;
    }

    let starter = orchestrator.clone();
    let first_npc = npc.clone();
    main.call(move || starter.start_conversation(player, first_npc))
        .await?;

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/greet" => orchestrator.greet(player, npc.clone()).await?,
            "/start" => {
                let starter = orchestrator.clone();
                let npc = npc.clone();
                main.call(move || starter.start_conversation(player, npc))
                    .await?;
            }
            "/purge" => match orchestrator.purge_archive().await {
                Ok(removed) => println!("  Purged {removed} archived line(s)."),
                Err(e) => eprintln!("  Purge failed: {e}"),
            },
            _ => {
                let receiver = orchestrator.clone();
                let message = line.clone();
                let outcome = main
                    .call(move || receiver.receive_message(player, &message))
                    .await?;
                if outcome == MessageOutcome::Ended {
                    println!("  Type /start to talk again or /quit to leave.");
                }
            }
        }
    }

    let leaving = orchestrator.clone();
    main.call(move || leaving.player_quit(player)).await?;
    println!("\n  Goodbye!\n");

    Ok(())
}
