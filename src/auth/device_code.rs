//! Interactive login through the OAuth device code flow

use async_trait::async_trait;
use colored::Colorize;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::aad::{IdentityError, request_token, tenant_endpoint};
use super::models::TokenInfo;
use crate::config::Config;

const SLOW_DOWN_STEP_SECS: u64 = 5;
const DEFAULT_EXPIRES_IN_SECS: u64 = 900;
const DEFAULT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("sign-in was declined")]
    Declined,
    #[error("sign-in was not completed in time")]
    Expired,
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Obtains a token with user involvement. May block for as long as the user needs.
#[async_trait]
pub trait InteractiveLogin: Send + Sync {
    async fn acquire_token_interactive(&self, subscription_id: &str) -> Result<TokenInfo, LoginError>;
}

/// Device code issued by the provider, shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCode {
    pub user_code: String,
    pub device_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
    pub message: String,
}

impl DeviceCode {
    /// v1 endpoints send `verification_url` and string numbers, v2 `verification_uri` and integers
    pub fn from_response(body: &Value) -> Result<Self, IdentityError> {
        let text = |key: &str| body.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());
        let number = |key: &str| {
            body.get(key)
                .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        };

        let user_code = text("user_code")
            .ok_or_else(|| IdentityError::MalformedResponse("no user code in response".to_string()))?;
        let device_code = text("device_code")
            .ok_or_else(|| IdentityError::MalformedResponse("no device code in response".to_string()))?;
        let verification_url = text("verification_url")
            .or_else(|| text("verification_uri"))
            .unwrap_or_else(|| "https://microsoft.com/devicelogin".to_string());
        let message = text("message").unwrap_or_else(|| {
            format!("To sign in, open {} and enter the code {}", verification_url, user_code)
        });

        Ok(Self {
            user_code,
            device_code,
            verification_url,
            expires_in: number("expires_in").unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            interval: number("interval").unwrap_or(DEFAULT_INTERVAL_SECS).max(1),
            message,
        })
    }
}

/// When polling stops; an `expires_in` too large for the clock falls back to the default
fn poll_deadline(start: Instant, expires_in: u64) -> Instant {
    start
        .checked_add(Duration::from_secs(expires_in))
        .unwrap_or_else(|| start + Duration::from_secs(DEFAULT_EXPIRES_IN_SECS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollAction {
    Wait,
    SlowDown,
    Fail,
}

fn poll_action(error: &IdentityError) -> PollAction {
    match error.code() {
        Some("authorization_pending") => PollAction::Wait,
        Some("slow_down") => PollAction::SlowDown,
        _ => PollAction::Fail,
    }
}

fn login_error(error: IdentityError) -> LoginError {
    match error.code() {
        Some("authorization_declined") | Some("access_denied") => LoginError::Declined,
        Some("expired_token") | Some("code_expired") => LoginError::Expired,
        _ => LoginError::Identity(error),
    }
}

type PromptFn = dyn Fn(&DeviceCode) + Send + Sync;

/// Device code sign-in against the configured authority
pub struct DeviceCodeLogin {
    client: Client,
    config: Config,
    prompt: Box<PromptFn>,
}

impl DeviceCodeLogin {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
            prompt: Box::new(|code: &DeviceCode| {
                eprintln!("{}", code.message.bold());
            }),
        }
    }

    /// Replace how the device code is presented to the user
    pub fn with_prompt(mut self, prompt: impl Fn(&DeviceCode) + Send + Sync + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    async fn request_device_code(&self, tenant: &str) -> Result<DeviceCode, IdentityError> {
        let url = tenant_endpoint(&self.config.auth.authority, tenant, "devicecode");
        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.config.auth.client_id.as_str()),
                ("resource", self.config.auth.resource.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await?;
            DeviceCode::from_response(&body)
        } else {
            let body = response.text().await?;
            Err(super::aad::parse_error_response(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl InteractiveLogin for DeviceCodeLogin {
    async fn acquire_token_interactive(&self, subscription_id: &str) -> Result<TokenInfo, LoginError> {
        let tenant = self.config.tenant_for(subscription_id);
        info!("Starting device code sign-in for subscription {} (tenant {})", subscription_id, tenant);

        let code = self.request_device_code(tenant).await?;
        (self.prompt)(&code);

        let token_url = tenant_endpoint(&self.config.auth.authority, tenant, "token");
        let deadline = poll_deadline(Instant::now(), code.expires_in);
        let mut interval = code.interval.max(1);

        loop {
            tokio::time::sleep(Duration::from_secs(interval)).await;
            if Instant::now() >= deadline {
                return Err(LoginError::Expired);
            }

            let result = request_token(
                &self.client,
                &token_url,
                &[
                    ("grant_type", "device_code"),
                    ("client_id", self.config.auth.client_id.as_str()),
                    ("resource", self.config.auth.resource.as_str()),
                    ("code", code.device_code.as_str()),
                ],
                None,
            )
            .await;

            match result {
                Ok(token) => {
                    info!("Device code sign-in completed for subscription {}", subscription_id);
                    return Ok(token);
                }
                Err(error) => match poll_action(&error) {
                    PollAction::Wait => debug!("Waiting for user to complete sign-in"),
                    PollAction::SlowDown => interval += SLOW_DOWN_STEP_SECS,
                    PollAction::Fail => return Err(login_error(error)),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_code_from_v1_response() {
        let body = json!({
            "user_code": "ABCD-EFGH",
            "device_code": "device-123",
            "verification_url": "https://microsoft.com/devicelogin",
            "expires_in": "900",
            "interval": "5",
            "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin"
        });

        let code = DeviceCode::from_response(&body).unwrap();
        assert_eq!(code.user_code, "ABCD-EFGH");
        assert_eq!(code.device_code, "device-123");
        assert_eq!(code.expires_in, 900);
        assert_eq!(code.interval, 5);
    }

    #[test]
    fn test_device_code_from_v2_response_builds_message() {
        let body = json!({
            "user_code": "XYZ",
            "device_code": "device-456",
            "verification_uri": "https://login.example/device",
            "expires_in": 600,
            "interval": 2
        });

        let code = DeviceCode::from_response(&body).unwrap();
        assert_eq!(code.verification_url, "https://login.example/device");
        assert_eq!(code.interval, 2);
        assert!(code.message.contains("XYZ"));
    }

    #[test]
    fn test_device_code_requires_codes() {
        assert!(DeviceCode::from_response(&json!({ "user_code": "only" })).is_err());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let body = json!({ "user_code": "A", "device_code": "B", "interval": 0 });
        assert_eq!(DeviceCode::from_response(&body).unwrap().interval, 1);
    }

    #[test]
    fn test_poll_deadline_overflow_uses_default() {
        let start = Instant::now();
        assert_eq!(poll_deadline(start, 60), start + Duration::from_secs(60));
        assert_eq!(
            poll_deadline(start, u64::MAX),
            start + Duration::from_secs(DEFAULT_EXPIRES_IN_SECS)
        );
    }

    fn rejected(code: &str) -> IdentityError {
        IdentityError::Rejected {
            status: 400,
            code: code.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_poll_actions() {
        assert_eq!(poll_action(&rejected("authorization_pending")), PollAction::Wait);
        assert_eq!(poll_action(&rejected("slow_down")), PollAction::SlowDown);
        assert_eq!(poll_action(&rejected("authorization_declined")), PollAction::Fail);
        assert_eq!(poll_action(&IdentityError::MissingRefreshToken), PollAction::Fail);
    }

    #[test]
    fn test_login_errors() {
        assert!(matches!(login_error(rejected("authorization_declined")), LoginError::Declined));
        assert!(matches!(login_error(rejected("expired_token")), LoginError::Expired));
        assert!(matches!(login_error(rejected("invalid_client")), LoginError::Identity(_)));
    }
}
