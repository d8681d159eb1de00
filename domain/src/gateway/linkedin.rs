//! LinkedIn OAuth 2.0 / OpenID Connect client.
//!
//! Builds the consent URL, exchanges the one-time authorization code for an
//! access token and reads the member's OpenID userinfo. Each call is made once;
//! a failure is terminal for the OAuth attempt.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, VerificationErrorKind};
use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use service::config::Config;
use std::time::Duration;

/// Scopes requested from LinkedIn. `openid profile` yields `sub` and `name`.
pub const SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Everything needed to talk to LinkedIn for one application.
pub struct LinkedInSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub http_timeout: Duration,
}

impl LinkedInSettings {
    /// Reads the LinkedIn application settings from `config`.
    ///
    /// Fails with `ProviderNotConfigured` unless client id, client secret and
    /// redirect URI are all present and non-empty.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        match (
            present(config.linkedin_client_id()),
            present(config.linkedin_client_secret()),
            present(config.linkedin_redirect_uri()),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(Self {
                client_id,
                client_secret: SecretString::new(client_secret),
                redirect_uri,
                auth_url: config.linkedin_auth_url().to_string(),
                token_url: config.linkedin_token_url().to_string(),
                userinfo_url: config.linkedin_userinfo_url().to_string(),
                http_timeout: Duration::from_secs(config.linkedin_http_timeout_secs),
            }),
            _ => {
                warn!("LinkedIn client id, secret or redirect URI is not configured");
                Err(Error::verification(
                    VerificationErrorKind::ProviderNotConfigured,
                ))
            }
        }
    }

    /// Consent URL for these settings carrying `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        authorization_url(&self.auth_url, &self.client_id, &self.redirect_uri, state)
    }
}

/// Builds the LinkedIn consent URL. Pure; performs no validation of its inputs.
pub fn authorization_url(auth_url: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?\
        response_type=code&\
        client_id={}&\
        redirect_uri={}&\
        state={}&\
        scope={}",
        auth_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
        urlencoding::encode(&SCOPES.join(" "))
    )
}

/// OAuth token response from LinkedIn
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OpenID Connect userinfo claims returned by LinkedIn
#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Identity of the member who granted consent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// Stable LinkedIn member identifier (`sub`).
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
}

impl From<UserInfo> for Profile {
    fn from(info: UserInfo) -> Self {
        let full_name = [info.given_name.as_deref(), info.family_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let display_name = match info.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None if !full_name.is_empty() => full_name,
            None => info.sub.clone(),
        };

        Profile {
            subject: info.sub,
            display_name,
            email: info.email,
            picture: info.picture,
        }
    }
}

/// Request to exchange authorization code for tokens
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'a str,
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

/// The outbound half of the callback: turns an authorization code into a profile.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_and_fetch_profile(&self, code: &str) -> Result<Profile, Error>;
}

/// reqwest backed LinkedIn client
pub struct LinkedInClient {
    client: reqwest::Client,
    settings: LinkedInSettings,
}

impl LinkedInClient {
    pub fn new(settings: LinkedInSettings) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(settings.http_timeout)
            .build()?;

        Ok(Self { client, settings })
    }

    /// Exchange authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let request = TokenExchangeRequest {
            grant_type: "authorization_code",
            code,
            client_id: &self.settings.client_id,
            client_secret: self.settings.client_secret.expose_secret(),
            redirect_uri: &self.settings.redirect_uri,
        };

        debug!("Exchanging LinkedIn authorization code for an access token");

        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange LinkedIn authorization code: {:?}", e);
                Error::from(e)
            })?;

        let tokens: TokenResponse = Self::parse_success(response, "token exchange").await?;
        info!("Successfully exchanged LinkedIn authorization code");
        Ok(tokens)
    }

    /// Get the member's OpenID userinfo using the access token
    pub async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .client
            .get(&self.settings.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to get LinkedIn userinfo: {:?}", e);
                Error::from(e)
            })?;

        Self::parse_success(response, "userinfo").await
    }

    async fn parse_success<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        call: &str,
    ) -> Result<T, Error> {
        let status = response.status();

        if status.is_success() {
            response.json::<T>().await.map_err(|e| {
                warn!("Failed to parse LinkedIn {call} response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                        "Invalid {call} response from LinkedIn"
                    ))),
                }
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!("LinkedIn {call} error ({status}): {body}");
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider {
                    status: status.as_u16(),
                    body,
                }),
            })
        }
    }
}

#[async_trait]
impl IdentityProvider for LinkedInClient {
    async fn exchange_and_fetch_profile(&self, code: &str) -> Result<Profile, Error> {
        let tokens = self.exchange_code(code).await?;
        let user_info = self.get_user_info(&tokens.access_token).await?;
        Ok(user_info.into())
    }
}
