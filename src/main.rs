//! pollgate CLI entry point.

use anyhow::Result;
use clap::Parser;

use pollgate::cli::commands::{self, lifecycle, watch};
use pollgate::cli::{handle_error, Cli, Commands};
use pollgate::infrastructure::config::ConfigLoader;
use pollgate::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli).await {
        handle_error(err, cli.json);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = ConfigLoader::load_from(cli.config.as_deref())?;
    let _logger = init_logging(&config.logging)?;

    let (json, memory) = (cli.json, cli.memory);
    match &cli.command {
        Commands::Enable(args) => {
            let store = commands::open_store(&config, memory).await?;
            lifecycle::execute_enable(args, &config, store, json).await
        }
        Commands::Disable(args) => {
            let store = commands::open_store(&config, memory).await?;
            lifecycle::execute_disable(args, &config, store, json).await
        }
        Commands::Test(args) => {
            let store = commands::open_store(&config, memory).await?;
            lifecycle::execute_test(args, &config, store, json).await
        }
        Commands::Poll(args) => {
            let store = commands::open_store(&config, memory).await?;
            lifecycle::execute_poll(args, &config, store, json).await
        }
        Commands::Watch(args) => {
            let store = commands::open_store(&config, memory).await?;
            watch::execute(args, &config, store, json).await
        }
        Commands::State(args) => lifecycle::execute_state(args, &config, memory, json).await,
    }
}
