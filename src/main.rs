use anyhow::Result;
use clap::Parser;
use log::info;

use azure_explorer::config::Config;

mod cli;

use cli::{Cli, Commands};
use cli::commands::{auth_command, config_command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("azure-explorer.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;
    info!("Starting azure-explorer");

    match cli.command {
        Commands::Auth(command) => auth_command(command, &config).await,
        Commands::Config(command) => config_command(command, &config),
    }
}
