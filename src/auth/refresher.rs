//! Replaces a rejected token for a subscription
//!
//! A refresh first redeems the stored refresh token silently. Only when the identity
//! provider rejects that refresh token as no longer valid does it fall back to interactive
//! login. Every other failure ends the attempt and leaves the stored token alone.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::aad::{IdentityError, IdentityProvider};
use super::device_code::{InteractiveLogin, LoginError};
use super::models::TokenInfo;
use super::store::CredentialStore;
use crate::api::resilience::CredentialRefresh;
use crate::config::Config;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no token stored for subscription")]
    NoToken,
    #[error("stored token has no refresh token")]
    NoRefreshToken,
    #[error("silent refresh failed: {0}")]
    Identity(#[source] IdentityError),
    #[error("interactive login failed: {0}")]
    Interactive(#[source] LoginError),
    #[error("credential store failure: {0}")]
    Store(#[source] anyhow::Error),
}

/// Which path produced the new token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPath {
    Silent,
    Interactive,
    /// A concurrent refresh stored a new token while this one waited
    Concurrent,
}

pub struct TokenRefresher {
    store: Arc<dyn CredentialStore>,
    identity: Arc<dyn IdentityProvider>,
    login: Arc<dyn InteractiveLogin>,
    config: Config,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenRefresher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        identity: Arc<dyn IdentityProvider>,
        login: Arc<dyn InteractiveLogin>,
        config: Config,
    ) -> Self {
        Self {
            store,
            identity,
            login,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Refreshes the token for a subscription and reports which path succeeded
    pub async fn try_refresh(&self, subscription_id: &str) -> Result<RefreshPath, RefreshError> {
        if !self.config.auth.serialize_refresh {
            return self.refresh_unlocked(subscription_id).await;
        }

        let observed = self.current_token(subscription_id).await?.map(|t| t.access_token);

        let lock = self.lock_for(subscription_id).await;
        let _guard = lock.lock().await;

        let current = self.current_token(subscription_id).await?.map(|t| t.access_token);
        if current.is_some() && current != observed {
            debug!("Token for subscription {} was replaced while waiting", subscription_id);
            return Ok(RefreshPath::Concurrent);
        }

        self.refresh_unlocked(subscription_id).await
    }

    async fn refresh_unlocked(&self, subscription_id: &str) -> Result<RefreshPath, RefreshError> {
        let token = self
            .current_token(subscription_id)
            .await?
            .ok_or(RefreshError::NoToken)?;

        if !token.has_refresh_token() {
            return Err(RefreshError::NoRefreshToken);
        }

        let tenant = self.config.tenant_for(subscription_id);
        let redeemed = self
            .identity
            .redeem_refresh_token(&token, tenant, &self.config.auth.resource, &self.config.auth.client_id)
            .await;

        let (new_token, path) = match redeemed {
            Ok(new_token) => (new_token, RefreshPath::Silent),
            Err(IdentityError::InvalidGrant { code, description }) => {
                info!(
                    "Refresh token for subscription {} rejected ({}: {}), signing in interactively",
                    subscription_id, code, description
                );
                let new_token = self
                    .login
                    .acquire_token_interactive(subscription_id)
                    .await
                    .map_err(RefreshError::Interactive)?;
                (new_token, RefreshPath::Interactive)
            }
            Err(error) => return Err(RefreshError::Identity(error)),
        };

        self.store
            .set_token(subscription_id, new_token)
            .await
            .map_err(RefreshError::Store)?;

        Ok(path)
    }

    async fn current_token(&self, subscription_id: &str) -> Result<Option<TokenInfo>, RefreshError> {
        self.store
            .get_token(subscription_id)
            .await
            .map_err(RefreshError::Store)
    }

    async fn lock_for(&self, subscription_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(subscription_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl CredentialRefresh for TokenRefresher {
    async fn refresh(&self, subscription_id: &str) -> bool {
        match self.try_refresh(subscription_id).await {
            Ok(path) => {
                info!("Refreshed credentials for subscription {} ({:?})", subscription_id, path);
                true
            }
            Err(error) => {
                warn!("Could not refresh credentials for subscription {}: {}", subscription_id, error);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};

    enum Redeem {
        Ok,
        InvalidGrant,
        Rejected,
    }

    struct FakeIdentity {
        outcome: Redeem,
        delay: std::time::Duration,
        calls: AtomicU32,
    }

    impl FakeIdentity {
        fn new(outcome: Redeem) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                delay: std::time::Duration::ZERO,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn redeem_refresh_token(
            &self,
            _token: &TokenInfo,
            tenant: &str,
            _resource: &str,
            _client_id: &str,
        ) -> Result<TokenInfo, IdentityError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.outcome {
                Redeem::Ok => Ok(TokenInfo::new(
                    format!("silent-{}-{}", tenant, call),
                    Some("refresh-2".to_string()),
                    Duration::hours(1),
                )),
                Redeem::InvalidGrant => Err(IdentityError::InvalidGrant {
                    code: "invalid_grant".to_string(),
                    description: "expired".to_string(),
                }),
                Redeem::Rejected => Err(IdentityError::Rejected {
                    status: 500,
                    code: "temporarily_unavailable".to_string(),
                    description: String::new(),
                }),
            }
        }
    }

    struct FakeLogin {
        succeed: bool,
        calls: AtomicU32,
    }

    impl FakeLogin {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl InteractiveLogin for FakeLogin {
        async fn acquire_token_interactive(&self, _subscription_id: &str) -> Result<TokenInfo, LoginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(TokenInfo::new("interactive", Some("refresh-3".to_string()), Duration::hours(1)))
            } else {
                Err(LoginError::Declined)
            }
        }
    }

    fn expired(refresh_token: Option<&str>) -> TokenInfo {
        TokenInfo::new("expired", refresh_token.map(|s| s.to_string()), Duration::minutes(-1))
    }

    async fn store_with(token: Option<TokenInfo>) -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        if let Some(token) = token {
            store.set_token("sub1", token).await.unwrap();
        }
        store
    }

    fn config_with_tenant() -> Config {
        let mut config = Config::default();
        config.add_subscription(
            "sub1".to_string(),
            crate::config::SubscriptionConfig {
                name: None,
                tenant_id: Some("tenant-a".to_string()),
            },
        );
        config
    }

    #[tokio::test]
    async fn test_no_token_fails_without_contacting_anyone() {
        let store = store_with(None).await;
        let identity = FakeIdentity::new(Redeem::Ok);
        let login = FakeLogin::new(true);
        let refresher = TokenRefresher::new(store, identity.clone(), login.clone(), Config::default());

        assert!(matches!(refresher.try_refresh("sub1").await, Err(RefreshError::NoToken)));
        assert!(!refresher.refresh("sub1").await);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
        assert_eq!(login.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_contacting_anyone() {
        let store = store_with(Some(expired(None))).await;
        let identity = FakeIdentity::new(Redeem::Ok);
        let login = FakeLogin::new(true);
        let refresher = TokenRefresher::new(store, identity.clone(), login.clone(), Config::default());

        assert!(matches!(refresher.try_refresh("sub1").await, Err(RefreshError::NoRefreshToken)));
        assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
        assert_eq!(login.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_silent_refresh_stores_new_token() {
        let store = store_with(Some(expired(Some("refresh-1")))).await;
        let identity = FakeIdentity::new(Redeem::Ok);
        let login = FakeLogin::new(true);
        let refresher = TokenRefresher::new(store.clone(), identity.clone(), login.clone(), config_with_tenant());

        assert_eq!(refresher.try_refresh("sub1").await.unwrap(), RefreshPath::Silent);

        let token = store.get_token("sub1").await.unwrap().unwrap();
        assert_eq!(token.access_token, "silent-tenant-a-0");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(login.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_grant_falls_back_to_interactive() {
        let store = store_with(Some(expired(Some("revoked")))).await;
        let identity = FakeIdentity::new(Redeem::InvalidGrant);
        let login = FakeLogin::new(true);
        let refresher = TokenRefresher::new(store.clone(), identity.clone(), login.clone(), Config::default());

        assert!(refresher.refresh("sub1").await);

        let token = store.get_token("sub1").await.unwrap().unwrap();
        assert_eq!(token.access_token, "interactive");
        assert_eq!(identity.calls.load(Ordering::SeqCst), 1);
        assert_eq!(login.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_declined_interactive_login_fails() {
        let store = store_with(Some(expired(Some("revoked")))).await;
        let identity = FakeIdentity::new(Redeem::InvalidGrant);
        let login = FakeLogin::new(false);
        let refresher = TokenRefresher::new(store.clone(), identity, login.clone(), Config::default());

        assert!(matches!(
            refresher.try_refresh("sub1").await,
            Err(RefreshError::Interactive(LoginError::Declined))
        ));
        assert_eq!(store.get_token("sub1").await.unwrap().unwrap().access_token, "expired");
    }

    #[tokio::test]
    async fn test_other_provider_error_leaves_token_and_skips_login() {
        let store = store_with(Some(expired(Some("refresh-1")))).await;
        let identity = FakeIdentity::new(Redeem::Rejected);
        let login = FakeLogin::new(true);
        let refresher = TokenRefresher::new(store.clone(), identity, login.clone(), Config::default());

        assert!(!refresher.refresh("sub1").await);
        assert_eq!(login.calls.load(Ordering::SeqCst), 0);

        let token = store.get_token("sub1").await.unwrap().unwrap();
        assert_eq!(token.access_token, "expired");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_redeem_once() {
        let store = store_with(Some(expired(Some("refresh-1")))).await;
        let identity = Arc::new(FakeIdentity {
            outcome: Redeem::Ok,
            delay: std::time::Duration::from_millis(50),
            calls: AtomicU32::new(0),
        });
        let login = FakeLogin::new(true);
        let refresher = TokenRefresher::new(store, identity.clone(), login, Config::default());

        let (first, second) = tokio::join!(refresher.try_refresh("sub1"), refresher.try_refresh("sub1"));

        let mut paths = vec![first.unwrap(), second.unwrap()];
        paths.sort_by_key(|path| *path as u8);
        assert_eq!(paths, vec![RefreshPath::Silent, RefreshPath::Concurrent]);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unserialized_refreshes_proceed_independently() {
        let store = store_with(Some(expired(Some("refresh-1")))).await;
        let identity = FakeIdentity::new(Redeem::Ok);
        let login = FakeLogin::new(true);
        let mut config = Config::default();
        config.auth.serialize_refresh = false;
        let refresher = TokenRefresher::new(store.clone(), identity.clone(), login, config);

        let (first, second) = tokio::join!(refresher.refresh("sub1"), refresher.refresh("sub1"));

        assert!(first && second);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 2);
        assert!(store.get_token("sub1").await.unwrap().unwrap().access_token.starts_with("silent-common-"));
    }
}
