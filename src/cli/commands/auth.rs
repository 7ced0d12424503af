//! Token management commands

use anyhow::{Context, Result};
use azure_explorer::auth::{
    AadIdentityProvider, CredentialStore, DeviceCodeLogin, FileCredentialStore, InteractiveLogin,
    TokenRefresher,
};
use azure_explorer::config::Config;
use clap::{Args, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;

#[derive(Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommands,
}

#[derive(Subcommand)]
pub enum AuthSubcommands {
    /// Show stored tokens and their expiry
    Status,
    /// Sign in interactively with a device code
    Login {
        /// Subscription id to sign in for
        subscription: String,
        /// Sign in even if a valid token exists
        #[arg(short, long)]
        force: bool,
    },
    /// Refresh the stored token, falling back to interactive sign-in
    Refresh {
        /// Subscription id whose token to refresh
        subscription: String,
    },
    /// Remove the stored token
    Logout {
        /// Subscription id whose token to remove
        subscription: String,
    },
}

pub async fn auth_command(command: AuthCommands, config: &Config) -> Result<()> {
    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::open(Config::get_token_path()?).await?);

    match command.command {
        AuthSubcommands::Status => status_command(config, store.as_ref()).await,
        AuthSubcommands::Login { subscription, force } => {
            login_command(config, store.as_ref(), &subscription, force).await
        }
        AuthSubcommands::Refresh { subscription } => refresh_command(config, store, &subscription).await,
        AuthSubcommands::Logout { subscription } => {
            store.remove_token(&subscription).await?;
            println!("{} Removed token for {}", "✓".bright_green(), subscription.bright_white().bold());
            Ok(())
        }
    }
}

async fn status_command(config: &Config, store: &dyn CredentialStore) -> Result<()> {
    println!();
    println!("  {}", "Azure Explorer Authentication Status".bright_blue().bold());
    println!("  {}", "════════════════════════════════════".bright_blue());

    let subscriptions = store.subscriptions().await?;
    if subscriptions.is_empty() {
        println!();
        println!("  {}", "No stored tokens".bright_yellow().bold());
        println!("    {}", "azure-explorer auth login <subscription>".cyan());
        return Ok(());
    }

    for subscription_id in &subscriptions {
        let Some(token) = store.get_token(subscription_id).await? else {
            continue;
        };

        let name = config
            .subscriptions
            .get(subscription_id)
            .and_then(|s| s.name.clone())
            .unwrap_or_default();

        println!();
        println!("  {} {}", subscription_id.bright_white().bold(), name.dimmed());
        println!("    {}: {}", "Tenant".dimmed(), config.tenant_for(subscription_id).cyan());

        let expiry = token.expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        if token.is_expired() {
            println!("    {}: {} {}", "Expires".dimmed(), expiry.bright_red(), "(expired)".bright_red());
        } else {
            println!("    {}: {}", "Expires".dimmed(), expiry.bright_green());
        }

        let refresh = if token.has_refresh_token() { "yes".bright_green() } else { "no".bright_yellow() };
        println!("    {}: {}", "Refreshable".dimmed(), refresh);
    }

    println!();
    Ok(())
}

async fn login_command(config: &Config, store: &dyn CredentialStore, subscription_id: &str, force: bool) -> Result<()> {
    if !force {
        if let Some(token) = store.get_token(subscription_id).await? {
            if !token.is_expired() {
                let proceed = Confirm::new()
                    .with_prompt(format!("A valid token exists for {}. Sign in again?", subscription_id))
                    .default(false)
                    .interact()
                    .context("Failed to read confirmation")?;
                if !proceed {
                    return Ok(());
                }
            }
        }
    }

    let login = DeviceCodeLogin::new(config.clone());
    let token = login
        .acquire_token_interactive(subscription_id)
        .await
        .with_context(|| format!("Sign-in for subscription '{}' failed", subscription_id))?;

    store.set_token(subscription_id, token).await?;
    println!("{} Signed in for {}", "✓".bright_green(), subscription_id.bright_white().bold());
    Ok(())
}

async fn refresh_command(config: &Config, store: Arc<dyn CredentialStore>, subscription_id: &str) -> Result<()> {
    let refresher = TokenRefresher::new(
        store,
        Arc::new(AadIdentityProvider::new(config.auth.authority.clone())),
        Arc::new(DeviceCodeLogin::new(config.clone())),
        config.clone(),
    );

    let path = refresher
        .try_refresh(subscription_id)
        .await
        .with_context(|| format!("Refreshing token for subscription '{}' failed", subscription_id))?;

    println!(
        "{} Refreshed token for {} ({:?})",
        "✓".bright_green(),
        subscription_id.bright_white().bold(),
        path
    );
    Ok(())
}
