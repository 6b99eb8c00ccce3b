use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{FutureExt, StreamExt};
use minesync_core::BoardConfig;
use minesync_protocol::{Coordinates, Notification};
use minesync_server::{
    ChannelBroadcaster, ConnectionId, GameId, MemoryStore, ServiceConfig, SessionController,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// What log level to use
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force a seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one game from the terminal, printing every notification as JSON
    Play(PlayArgs),
    /// Print the effective settings
    Config,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[arg(long, default_value = "local")]
    game_id: String,
    #[arg(long)]
    size: Option<u32>,
    #[arg(long)]
    bombs: Option<u32>,
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Reveal(Coordinates),
    Flag(Coordinates),
    View,
    Quit,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = cli.verbose.log_level_filter().as_str().to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("Could not load {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if cli.seed.is_some() {
        config.board.seed = cli.seed;
    }
    config.validate()?;

    match cli.command {
        Command::Play(args) => play(config, args),
        Command::Config => {
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
    }
}

fn play(config: ServiceConfig, args: PlayArgs) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let board = match (args.size, args.bombs) {
        (None, None) => None,
        (size, bombs) => Some(BoardConfig::new(
            size.unwrap_or(config.board.size),
            bombs.unwrap_or(config.board.bombs),
        )?),
    };
    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let controller = SessionController::new(MemoryStore::new(), Arc::clone(&broadcaster), config);
    let connection = ConnectionId::new("terminal");
    let mut inbox = broadcaster.register(connection.clone());
    let id = GameId::parse(args.game_id)?;

    runtime.block_on(async {
        controller.create_session(&id, board).await?;
        controller.join(&id, &connection).await
    })?;
    print_pending(&mut inbox)?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        // Rejected moves also arrive in the inbox as messages.
        match input {
            Input::Reveal(at) => {
                if let Err(err) = runtime.block_on(controller.reveal_at(&connection, &id, at)) {
                    log::debug!("Reveal rejected: {err}");
                }
            }
            Input::Flag(at) => {
                if let Err(err) = runtime.block_on(controller.toggle_flag_at(&connection, &id, at))
                {
                    log::debug!("Flag toggle rejected: {err}");
                }
            }
            Input::View => {
                let view = runtime.block_on(controller.view(&id))?;
                println!("{}", serde_json::to_string(&view)?);
            }
            Input::Quit => break,
        }
        print_pending(&mut inbox)?;
    }

    runtime.block_on(controller.leave(&connection))?;
    broadcaster.unregister(&connection);
    Ok(())
}

fn parse_input(line: &str) -> anyhow::Result<Input> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let mut coordinate = |axis: &str| -> anyhow::Result<i64> {
        let raw = words
            .next()
            .with_context(|| format!("Missing {axis} coordinate"))?;
        raw.parse()
            .with_context(|| format!("Invalid {axis} coordinate {raw:?}"))
    };

    let input = match command {
        "reveal" | "r" => Input::Reveal(Coordinates {
            x: coordinate("x")?,
            y: coordinate("y")?,
        }),
        "flag" | "f" => Input::Flag(Coordinates {
            x: coordinate("x")?,
            y: coordinate("y")?,
        }),
        "view" | "v" => Input::View,
        "quit" | "q" => Input::Quit,
        other => bail!("Unknown command {other:?}, expected reveal, flag, view or quit"),
    };
    Ok(input)
}

fn print_pending(inbox: &mut UnboundedReceiver<Notification>) -> anyhow::Result<()> {
    while let Some(Some(notification)) = inbox.next().now_or_never() {
        println!("{}", notification.to_json()?);
    }
    Ok(())
}
