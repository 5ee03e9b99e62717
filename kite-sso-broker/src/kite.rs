//! Kite Connect client: login URL and request-token exchange.
//!
//! Kite's login page redirects back to the app's registered redirect URL
//! with `status`, `request_token` and whatever was passed in
//! `redirect_params`. The request token is traded for a session at
//! `POST /session/token`, authenticated by
//! `checksum = sha256(api_key + request_token + api_secret)`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::provider::{Identity, IdentityProvider, ProviderError};

pub const KITE_API_VERSION: &str = "3";

pub struct KiteClient {
    api_key: String,
    login_url: String,
    api_root: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct KiteEnvelope {
    status: String,
    #[serde(default)]
    data: Option<KiteSession>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Deserialize)]
struct KiteSession {
    user_id: String,
    #[serde(default)]
    user_shortname: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl KiteClient {
    pub fn new(
        api_key: impl Into<String>,
        login_url: impl Into<String>,
        api_root: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kite-sso-broker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_key: api_key.into(),
            login_url: login_url.into(),
            api_root: api_root.into(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.kite_key.clone(),
            config.kite_login_url.clone(),
            config.kite_api_root.clone(),
            Duration::from_secs(config.kite_timeout_secs),
        )
    }
}

/// Hex SHA-256 of `api_key + request_token + api_secret`.
pub fn checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(request_token.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl IdentityProvider for KiteClient {
    fn login_url(&self) -> String {
        match url::Url::parse(&self.login_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("api_key", &self.api_key)
                    .append_pair("v", KITE_API_VERSION);
                url.into()
            }
            // Left as-is so the redirect step reports the misconfiguration.
            Err(_) => self.login_url.clone(),
        }
    }

    async fn exchange_code(
        &self,
        request_token: &str,
        api_secret: &str,
    ) -> Result<Identity, ProviderError> {
        let url = format!("{}/session/token", self.api_root.trim_end_matches('/'));
        let checksum = checksum(&self.api_key, request_token, api_secret);
        let resp = self
            .http
            .post(&url)
            .header("X-Kite-Version", KITE_API_VERSION)
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("request_token", request_token),
                ("checksum", checksum.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let envelope: KiteEnvelope = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(format!("HTTP {status}: {e}")))?;

        if !status.is_success() || envelope.status != "success" {
            return Err(ProviderError::Api {
                error_type: envelope
                    .error_type
                    .unwrap_or_else(|| "GeneralException".to_string()),
                message: envelope.message.unwrap_or_else(|| format!("HTTP {status}")),
            });
        }

        let session = envelope
            .data
            .ok_or_else(|| ProviderError::Decode("session response has no data".to_string()))?;
        tracing::debug!(user_id = %session.user_id, "Kite session created");
        Ok(Identity {
            external_id: session.user_id,
            email: session.email,
            name: session.user_shortname,
            avatar_url: session.avatar_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_of_concatenation() {
        let expected = hex::encode(Sha256::digest(b"keytokensecret"));
        assert_eq!(checksum("key", "token", "secret"), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn login_url_carries_key_and_version() {
        let client = KiteClient::new(
            "my key",
            "https://kite.zerodha.com/connect/login",
            "https://api.kite.trade",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.login_url(),
            "https://kite.zerodha.com/connect/login?api_key=my+key&v=3"
        );
    }

    #[test]
    fn login_url_keeps_existing_query() {
        let client = KiteClient::new(
            "key",
            "https://kite.example/connect/login?lang=en",
            "https://api.kite.trade",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.login_url(),
            "https://kite.example/connect/login?lang=en&api_key=key&v=3"
        );
    }

    #[test]
    fn unparseable_login_url_is_passed_through() {
        let client = KiteClient::new("key", "not a url", "https://api.kite.trade", Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.login_url(), "not a url");
    }
}
