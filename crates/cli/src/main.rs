use clap::{Parser, Subcommand};
use kbridge::adapter::{Adapter, AdapterState};
use kbridge::channels::KeybaseClient;
use kbridge::config::{self, Config};
use kbridge::message::CanonicalMessage;
use kbridge::participants::ParticipantRegistry;
use kbridge::room::RoomAddress;
use kbridge::runtime::BotRuntime;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kbridge")]
#[command(about = "Keybase chat adapter for bot runtimes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the adapter: listen on all Keybase channels and print each normalized message as a JSON line on stdout.
    Run {
        /// Config file path (default: KBRIDGE_CONFIG_PATH or ~/.kbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Send one or more messages to a room (e.g. "eng#general" or "alice,bob").
    Send {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Room address
        #[arg(long, short)]
        room: String,

        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Reply to a user in a room; the user is mentioned when the room is a DM.
    Reply {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long, short)]
        room: String,

        /// Display name of the user being answered
        #[arg(long, value_name = "NAME")]
        to: String,

        #[arg(required = true)]
        texts: Vec<String>,
    },
}

/// Runtime that writes every canonical message to stdout for an external bot process.
struct StdoutRuntime;

impl BotRuntime for StdoutRuntime {
    fn receive(&self, message: CanonicalMessage) {
        match serde_json::to_string(&message) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
                    log::warn!("stdout closed, dropping {}", message.id());
                }
            }
            Err(e) => log::warn!("serializing {} failed: {}", message.id(), e),
        }
    }

    fn connected(&self) {
        log::info!("adapter connected");
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("kbridge {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run { config }) => {
            if let Err(e) = run_adapter(config).await {
                log::error!("adapter failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            room,
            texts,
        }) => {
            if let Err(e) = run_send(config, room, None, texts).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Reply {
            config,
            room,
            to,
            texts,
        }) => {
            if let Err(e) = run_send(config, room, Some(to), texts).await {
                log::error!("reply failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn build_adapter(config: &Config) -> anyhow::Result<Adapter> {
    let identity = config::resolve_bot_identity(config);
    if let Some(username) = config::resolve_keybase_username(config) {
        log::info!("keybase account: {}", username);
    }
    let client = Arc::new(KeybaseClient::new(Some(config::resolve_keybase_binary(config))));
    let state = AdapterState::new(identity, Arc::new(ParticipantRegistry::new()));
    Ok(Adapter::new(state, client, Arc::new(StdoutRuntime))
        .with_unfurl_mode(config::resolve_unfurl_mode(config)?))
}

async fn run_adapter(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    build_adapter(&config)?.run().await
}

async fn run_send(
    config_path: Option<PathBuf>,
    room: String,
    to: Option<String>,
    texts: Vec<String>,
) -> anyhow::Result<()> {
    let (config, _) = config::load_config(config_path)?;
    let adapter = build_adapter(&config)?;
    let room = RoomAddress::from(room);
    let acks = match to {
        Some(name) => adapter.reply(&room, &name, &texts).await?,
        None => adapter.send(&room, &texts).await?,
    };
    for ack in acks {
        match ack.id {
            Some(id) => println!("{} ({})", ack.message, id),
            None => println!("{}", ack.message),
        }
    }
    Ok(())
}
