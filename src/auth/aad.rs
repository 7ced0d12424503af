//! Azure Active Directory token endpoint client

use async_trait::async_trait;
use chrono::Duration;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::models::TokenInfo;

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// OAuth error codes meaning the refresh token can no longer be redeemed silently
const INTERACTION_REQUIRED_CODES: &[&str] = &["invalid_grant", "interaction_required"];

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The refresh token was rejected; only an interactive login can recover
    #[error("refresh token rejected ({code}): {description}")]
    InvalidGrant { code: String, description: String },
    #[error("identity provider returned HTTP {status} ({code}): {description}")]
    Rejected {
        status: u16,
        code: String,
        description: String,
    },
    #[error("no refresh token to redeem")]
    MissingRefreshToken,
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

impl IdentityError {
    /// OAuth `error` code reported by the provider, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            IdentityError::InvalidGrant { code, .. } | IdentityError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Redeems refresh tokens for new access tokens
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn redeem_refresh_token(
        &self,
        token: &TokenInfo,
        tenant: &str,
        resource: &str,
        client_id: &str,
    ) -> Result<TokenInfo, IdentityError>;
}

/// Identity provider backed by the AAD v1 `oauth2/token` endpoint
#[derive(Debug, Clone)]
pub struct AadIdentityProvider {
    client: Client,
    authority: String,
}

impl AadIdentityProvider {
    pub fn new(authority: impl Into<String>) -> Self {
        Self::with_client(authority, Client::new())
    }

    pub fn with_client(authority: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            authority: authority.into(),
        }
    }

    pub fn token_url(&self, tenant: &str) -> String {
        tenant_endpoint(&self.authority, tenant, "token")
    }
}

#[async_trait]
impl IdentityProvider for AadIdentityProvider {
    async fn redeem_refresh_token(
        &self,
        token: &TokenInfo,
        tenant: &str,
        resource: &str,
        client_id: &str,
    ) -> Result<TokenInfo, IdentityError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or(IdentityError::MissingRefreshToken)?;

        debug!("Redeeming refresh token against tenant {} for {}", tenant, resource);

        request_token(
            &self.client,
            &self.token_url(tenant),
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("resource", resource),
            ],
            Some(refresh_token),
        )
        .await
    }
}

pub(crate) fn tenant_endpoint(authority: &str, tenant: &str, endpoint: &str) -> String {
    format!("{}/{}/oauth2/{}", authority.trim_end_matches('/'), tenant, endpoint)
}

/// Posts a token request form and turns the answer into a token or a classified error
pub(crate) async fn request_token(
    client: &Client,
    url: &str,
    form: &[(&str, &str)],
    previous_refresh_token: Option<&str>,
) -> Result<TokenInfo, IdentityError> {
    let response = client.post(url).form(form).send().await?;
    let status = response.status();

    debug!("Token request status: {}", status);

    if status.is_success() {
        let body: Value = response.json().await?;
        parse_token_response(&body, previous_refresh_token)
    } else {
        let body = response.text().await?;
        Err(parse_error_response(status.as_u16(), &body))
    }
}

/// Builds a token from a successful response. `expires_in` may be a number or a string
/// depending on the endpoint version. A response without a refresh token keeps the one
/// that was redeemed.
pub(crate) fn parse_token_response(body: &Value, previous_refresh_token: Option<&str>) -> Result<TokenInfo, IdentityError> {
    let access_token = body
        .get("access_token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| IdentityError::MalformedResponse("no access token in response".to_string()))?;

    let expires_in = body
        .get("expires_in")
        .and_then(|e| e.as_i64().or_else(|| e.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    let refresh_token = body
        .get("refresh_token")
        .and_then(|t| t.as_str())
        .or(previous_refresh_token)
        .map(|s| s.to_string());

    Ok(TokenInfo::new(access_token, refresh_token, Duration::seconds(expires_in)))
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Classifies an error answer by its OAuth `error` code
pub(crate) fn parse_error_response(status: u16, body: &str) -> IdentityError {
    let Ok(parsed) = serde_json::from_str::<OAuthErrorBody>(body) else {
        return IdentityError::Rejected {
            status,
            code: "unknown".to_string(),
            description: body.trim().to_string(),
        };
    };

    let description = parsed.error_description.unwrap_or_default();
    if INTERACTION_REQUIRED_CODES.contains(&parsed.error.as_str()) {
        IdentityError::InvalidGrant {
            code: parsed.error,
            description,
        }
    } else {
        IdentityError::Rejected {
            status,
            code: parsed.error,
            description,
        }
    }
}
