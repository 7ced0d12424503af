use super::commands::{AuthCommands, ConfigCommands};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "azure-explorer")]
#[command(about = "Manage Azure credentials used by the resource explorer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Token management per subscription
    Auth(AuthCommands),
    /// Configuration management
    Config(ConfigCommands),
}
