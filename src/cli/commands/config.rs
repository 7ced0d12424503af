use anyhow::{Context, Result};
use azure_explorer::config::{Config, SubscriptionConfig};
use clap::{Args, Subcommand};
use colored::*;

#[derive(Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show the effective configuration
    Show,
    /// Register a subscription and the tenant that issues its tokens
    AddSubscription {
        /// Subscription id
        id: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Tenant id or domain
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Forget a subscription
    RemoveSubscription {
        /// Subscription id
        id: String,
    },
}

pub fn config_command(command: ConfigCommands, config: &Config) -> Result<()> {
    match command.command {
        ConfigSubcommands::Show => {
            println!("{}: {}", "Config file".dimmed(), Config::get_config_path()?.display().to_string().cyan());
            println!("{}: {}", "Token file".dimmed(), Config::get_token_path()?.display().to_string().cyan());
            println!();
            print!("{}", toml::to_string_pretty(config).context("Failed to serialize config")?);
            Ok(())
        }
        ConfigSubcommands::AddSubscription { id, name, tenant } => {
            // Persist the file contents, not the environment overrides
            let mut stored = Config::load_from(&Config::get_config_path()?)?;
            stored.add_subscription(id.clone(), SubscriptionConfig { name, tenant_id: tenant });
            stored.save()?;
            println!("{} Added subscription {}", "✓".bright_green(), id.bright_white().bold());
            Ok(())
        }
        ConfigSubcommands::RemoveSubscription { id } => {
            let mut stored = Config::load_from(&Config::get_config_path()?)?;
            stored.remove_subscription(&id)?;
            stored.save()?;
            println!("{} Removed subscription {}", "✓".bright_green(), id.bright_white().bold());
            Ok(())
        }
    }
}
