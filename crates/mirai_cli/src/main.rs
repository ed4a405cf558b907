mod commands;
mod transcript;

use anyhow::Context;
use clap::Parser;
use commands::{Command, HELP};
use mirai_core::{FileBackend, MiraiConfig, SettingsStore};
use mirai_reasoning::providers::create_client;
use mirai_reasoning::PersonaChat;
use mirai_session::{ConversationSession, SendOutcome};
use mirai_voice::TtsFactory;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transcript::Transcript;

#[derive(Parser, Debug)]
#[command(name = "mirai", version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "MIRAI_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the persisted settings
    #[arg(long)]
    settings_dir: Option<PathBuf>,

    /// Discard saved settings and start from the defaults
    #[arg(long)]
    reset_settings: bool,

    /// Do not produce any audio
    #[arg(long)]
    mute: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 1. Config
    let mut config = match &args.config {
        Some(path) => MiraiConfig::load_or_default(path),
        None => MiraiConfig::from_env(),
    };
    if let Some(dir) = args.settings_dir {
        config.storage.settings_dir = Some(dir);
    }

    // 2. Settings
    let settings_dir = config.storage.settings_dir();
    info!("Settings directory: {}", settings_dir.display());
    let store = SettingsStore::open(Arc::new(FileBackend::new(&settings_dir)));
    if args.reset_settings {
        store.reset();
    }

    // 3. Reply backend. A missing credential ends the program here.
    let llm = create_client(&config.llm).context("Failed to initialize the reply backend")?;
    let chat = Arc::new(PersonaChat::new(llm));

    // 4. Speech
    let tts = Arc::new(
        TtsFactory::from_config(&config.voice, args.mute)
            .context("Failed to initialize speech synthesis")?,
    );

    // 5. Session
    let session = ConversationSession::new(store.get(), chat, tts);
    let _follower = session.follow(store.subscribe());
    let _printer = spawn_printer(session.clone());

    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Command::Say(text) => {
                if session.send_message(&text) == SendOutcome::Busy {
                    println!("(still waiting for the last reply)");
                }
            }
            Command::Edit(edit) => match edit.apply(&store.get()) {
                Ok(settings) => store.set(settings),
                Err(e) => warn!("Rejected settings change: {}", e),
            },
            Command::ShowSettings => {
                println!("{}", serde_json::to_string_pretty(&store.get())?);
            }
            Command::Clear => session.reset(),
            Command::ResetSettings => {
                store.reset();
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Invalid(message) => println!("{}", message),
        }
    }

    info!("Goodbye");
    Ok(())
}

/// Print every new message as the session publishes it.
fn spawn_printer(session: ConversationSession) -> JoinHandle<()> {
    let mut updates = session.subscribe();
    tokio::spawn(async move {
        let mut transcript = Transcript::new();
        loop {
            let snapshot = updates.borrow_and_update().clone();
            let name = session.settings().character.name;
            for line in transcript.update(&snapshot, &name) {
                println!("{}", line);
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    })
}
