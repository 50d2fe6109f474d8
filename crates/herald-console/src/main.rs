//! Interactive console for herald command trees
//!
//! Reads command lines from stdin and dispatches them as a configured actor.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;
mod roster;
mod session;

use commands::{build_command_tree, Transcript};
use roster::Roster;
use session::Session;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Herald - hierarchical command dispatch console", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "herald.toml")]
    config: PathBuf,

    /// Actor to act as, by name or id
    #[arg(long = "as", value_name = "ACTOR")]
    actor: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let roster = Arc::new(Roster::from_config(&config.actors));
    let requested = cli.actor.as_deref().or(config.default_actor.as_deref());
    let actor = match requested {
        Some(token) => roster
            .find(token)
            .cloned()
            .ok_or_else(|| anyhow!("unknown actor {token:?}"))?,
        None => roster
            .players()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("no actors configured"))?,
    };

    let transcript = Transcript::default();
    let root = build_command_tree(Arc::clone(&roster), &transcript)?;
    let session = Session::new(
        root,
        actor,
        transcript,
        config.prompt,
        config.command_prefix,
    );

    tracing::info!(actor = %session.actor().name, "console ready");
    let stdin = std::io::stdin();
    session.run(stdin.lock(), std::io::stdout())?;
    Ok(())
}
