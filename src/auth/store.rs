//! Credential stores keyed by subscription id

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::models::TokenInfo;

/// Process-wide token storage. Writes replace the whole token for a subscription.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_token(&self, subscription_id: &str) -> Result<Option<TokenInfo>>;

    async fn set_token(&self, subscription_id: &str, token: TokenInfo) -> Result<()>;

    async fn remove_token(&self, subscription_id: &str) -> Result<()>;

    /// Subscriptions that currently have a token, sorted
    async fn subscriptions(&self) -> Result<Vec<String>>;
}

/// Tokens kept in memory only
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<HashMap<String, TokenInfo>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: HashMap<String, TokenInfo>) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_token(&self, subscription_id: &str) -> Result<Option<TokenInfo>> {
        Ok(self.tokens.read().await.get(subscription_id).cloned())
    }

    async fn set_token(&self, subscription_id: &str, token: TokenInfo) -> Result<()> {
        self.tokens.write().await.insert(subscription_id.to_string(), token);
        Ok(())
    }

    async fn remove_token(&self, subscription_id: &str) -> Result<()> {
        self.tokens.write().await.remove(subscription_id);
        Ok(())
    }

    async fn subscriptions(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tokens.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Tokens cached in memory and persisted as JSON.
///
/// The file is rewritten through a temporary sibling and a rename, so a reader never
/// observes a half-written token set.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    tokens: RwLock<HashMap<String, TokenInfo>>,
}

impl FileCredentialStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check token file: {:?}", path))?;

        let tokens = if exists {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read token file: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse token file: {:?}", path))?
        } else {
            log::debug!("Token file {:?} does not exist yet", path);
            HashMap::new()
        };

        log::debug!("Loaded {} stored token(s) from {:?}", tokens.len(), path);

        Ok(Self {
            path,
            tokens: RwLock::new(tokens),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tokens: &HashMap<String, TokenInfo>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create token directory: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;
        let temp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, content)
            .await
            .with_context(|| format!("Failed to write token file: {:?}", temp_path))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace token file: {:?}", self.path))?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get_token(&self, subscription_id: &str) -> Result<Option<TokenInfo>> {
        Ok(self.tokens.read().await.get(subscription_id).cloned())
    }

    async fn set_token(&self, subscription_id: &str, token: TokenInfo) -> Result<()> {
        // Hold the write lock across the file write so writers cannot interleave
        let mut tokens = self.tokens.write().await;
        let mut updated = tokens.clone();
        updated.insert(subscription_id.to_string(), token);

        self.persist(&updated).await?;
        *tokens = updated;

        log::debug!("Saved token for subscription: {}", subscription_id);
        Ok(())
    }

    async fn remove_token(&self, subscription_id: &str) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        if !tokens.contains_key(subscription_id) {
            return Ok(());
        }

        let mut updated = tokens.clone();
        updated.remove(subscription_id);

        self.persist(&updated).await?;
        *tokens = updated;

        log::debug!("Deleted token for subscription: {}", subscription_id);
        Ok(())
    }

    async fn subscriptions(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tokens.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_token_file() -> PathBuf {
        std::env::temp_dir()
            .join(format!("azure-explorer-test-{}", uuid::Uuid::new_v4()))
            .join("tokens.json")
    }

    #[tokio::test]
    async fn test_memory_store_replaces_whole_token() {
        let store = MemoryCredentialStore::new();
        assert!(store.get_token("sub1").await.unwrap().is_none());

        store
            .set_token("sub1", TokenInfo::new("old", Some("r1".to_string()), Duration::hours(1)))
            .await
            .unwrap();
        store
            .set_token("sub1", TokenInfo::new("new", None, Duration::hours(1)))
            .await
            .unwrap();

        let token = store.get_token("sub1").await.unwrap().unwrap();
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token, None);
        assert_eq!(store.subscriptions().await.unwrap(), vec!["sub1".to_string()]);

        store.remove_token("sub1").await.unwrap();
        assert!(store.get_token("sub1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let path = temp_token_file();

        let store = FileCredentialStore::open(&path).await.unwrap();
        store
            .set_token("sub-b", TokenInfo::new("token-b", Some("refresh-b".to_string()), Duration::hours(1)))
            .await
            .unwrap();
        store
            .set_token("sub-a", TokenInfo::new("token-a", None, Duration::hours(1)))
            .await
            .unwrap();

        let reopened = FileCredentialStore::open(&path).await.unwrap();
        let token = reopened.get_token("sub-b").await.unwrap().unwrap();
        assert_eq!(token.access_token, "token-b");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-b"));
        assert_eq!(
            reopened.subscriptions().await.unwrap(),
            vec!["sub-a".to_string(), "sub-b".to_string()]
        );

        reopened.remove_token("sub-b").await.unwrap();
        let again = FileCredentialStore::open(&path).await.unwrap();
        assert!(again.get_token("sub-b").await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let path = temp_token_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(FileCredentialStore::open(&path).await.is_err());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_file_store_surfaces_unreadable_location() {
        let path = temp_token_file();
        let parent = path.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(parent.parent().unwrap()).unwrap();
        // A regular file where the token directory should be
        std::fs::write(&parent, "not a directory").unwrap();

        assert!(FileCredentialStore::open(&path).await.is_err());

        let _ = std::fs::remove_file(&parent);
    }
}
