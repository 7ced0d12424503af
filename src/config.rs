use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TENANT: &str = "common";

/// Identity settings used when redeeming and acquiring tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_authority")]
    pub authority: String,
    /// Resource the management API tokens are issued for
    #[serde(default = "default_resource")]
    pub resource: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Serialize refreshes per subscription so concurrent 401s prompt only once
    #[serde(default = "default_serialize_refresh")]
    pub serialize_refresh: bool,
}

fn default_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_resource() -> String {
    "https://management.core.windows.net/".to_string()
}

fn default_client_id() -> String {
    "04b07795-8ddb-461a-bbee-02f9e1bf7b46".to_string()
}

fn default_serialize_refresh() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            resource: default_resource(),
            client_id: default_client_id(),
            serialize_refresh: default_serialize_refresh(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub subscriptions: BTreeMap<String, SubscriptionConfig>,
}

impl Config {
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("azure-explorer")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".azure-explorer")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_token_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("tokens.json"))
    }

    /// Loads the user config and applies environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);

        if !path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        debug!("Loaded config with {} subscriptions", config.subscriptions.len());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", path);

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))?;

        info!("Config saved successfully");
        Ok(())
    }

    /// Overrides from `AZURE_AUTHORITY_HOST`, `AZURE_CLIENT_ID` and `AZURE_MANAGEMENT_RESOURCE`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(authority) = non_empty("AZURE_AUTHORITY_HOST") {
            debug!("Authority overridden from environment");
            self.auth.authority = authority;
        }
        if let Some(client_id) = non_empty("AZURE_CLIENT_ID") {
            debug!("Client id overridden from environment");
            self.auth.client_id = client_id;
        }
        if let Some(resource) = non_empty("AZURE_MANAGEMENT_RESOURCE") {
            debug!("Management resource overridden from environment");
            self.auth.resource = resource;
        }
    }

    /// Tenant that issues tokens for a subscription, `common` when unknown
    pub fn tenant_for(&self, subscription_id: &str) -> &str {
        self.subscriptions
            .get(subscription_id)
            .and_then(|subscription| subscription.tenant_id.as_deref())
            .filter(|tenant| !tenant.trim().is_empty())
            .unwrap_or(DEFAULT_TENANT)
    }

    pub fn add_subscription(&mut self, subscription_id: String, subscription: SubscriptionConfig) {
        info!("Adding subscription: {}", subscription_id);
        self.subscriptions.insert(subscription_id, subscription);
    }

    pub fn remove_subscription(&mut self, subscription_id: &str) -> Result<()> {
        if self.subscriptions.remove(subscription_id).is_none() {
            anyhow::bail!("Subscription '{}' not found", subscription_id);
        }

        warn!("Removed subscription: {}", subscription_id);
        Ok(())
    }
}
