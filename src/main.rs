//! checkmind -- a policy-network checkers agent speaking a line protocol.
//!
//! This binary reads commands from stdin and writes responses to stdout.
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use checkmind::config::AgentConfig;
use checkmind::engine::Session;
use checkmind::protocol::parser::{parse_command, Command};

#[derive(Debug, Parser)]
#[command(name = "checkmind", version, about)]
struct Cli {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Load the policy model before reading commands.
    #[arg(long)]
    load: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AgentConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AgentConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut session = Session::new(config);

    if cli.load {
        runtime.block_on(session.handle_load(&mut out))?;
    }

    info!("checkmind ready, playing {}", session.config().side.name());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        match cmd {
            Command::IsReady => session.handle_isready(&mut out)?,
            Command::SetOption { name, value } => session.set_option(&name, value),
            Command::Load => runtime.block_on(session.handle_load(&mut out))?,
            Command::NewGame => session.new_game(),
            Command::Position { board } => {
                if let Err(e) = session.set_position(&board) {
                    warn!("{}", e);
                }
            }
            Command::Go(params) => session.handle_go(&params, &mut out)?,
            Command::Eval { move_number } => session.handle_eval(move_number, &mut out)?,
            Command::History => session.handle_history(&mut out)?,
            Command::Quit => break,
        }
    }

    Ok(())
}
