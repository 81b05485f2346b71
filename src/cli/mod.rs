//! Command-line interface for running polling triggers by hand.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{StateArgs, TriggerArgs, WatchArgs};

#[derive(Parser, Debug)]
#[command(name = "pollgate", version, about = "Polling trigger engine with deduplicated emission")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to pollgate.yaml + pollgate.local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Keep trigger state in memory instead of the SQLite database
    #[arg(long, global = true)]
    pub memory: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Establish a baseline so only items created from now on are emitted
    Enable(TriggerArgs),
    /// Forget the instance's dedup state
    Disable(TriggerArgs),
    /// Preview what a poll would emit without changing state
    Test(TriggerArgs),
    /// Run one poll tick and print the new items
    Poll(TriggerArgs),
    /// Poll on a fixed interval until Ctrl-C
    Watch(WatchArgs),
    /// Show persisted trigger state
    State(StateArgs),
}

/// Print an error in the selected format and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
