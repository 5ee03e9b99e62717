//! The two-step DiscourseConnect ⇄ Kite handshake.
//!
//! 1. `begin`: verify the forum's signed envelope, pull out its nonce and
//!    send the user to Kite with the nonce tucked into `redirect_params`.
//! 2. `finish`: Kite echoes the nonce back next to a one-time request token.
//!    Trade the token for the user's identity, seal identity + nonce into a
//!    new envelope and send the user back to the forum.
//!
//! Nothing is stored between the two steps. The nonce riding through Kite's
//! redirect is the only link between them.

use std::sync::Arc;

use url::Url;

use crate::config::Config;
use crate::envelope::SsoEnvelope;
use crate::error::SsoError;
use crate::form::FormParams;
use crate::provider::{Identity, IdentityProvider};

/// Forum endpoint that consumes the outbound envelope.
pub const SSO_LOGIN_PATH: &str = "/session/sso_login";

/// Query parameter Kite echoes back verbatim on its callback.
pub const REDIRECT_PARAMS: &str = "redirect_params";

/// Query parameters of Kite's login callback.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Callback {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub request_token: String,
    #[serde(default)]
    pub nonce: String,
}

pub struct Broker {
    config: Config,
    provider: Arc<dyn IdentityProvider>,
}

impl Broker {
    pub fn new(config: Config, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { config, provider }
    }

    /// Step one. Returns the Kite login URL to redirect to.
    pub fn begin(&self, envelope: &SsoEnvelope) -> Result<Url, SsoError> {
        let nonce = match inbound_nonce(envelope, self.config.sso_secret_bytes()) {
            Ok(nonce) => nonce,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected SSO request");
                return Err(e);
            }
        };
        if nonce.is_empty() {
            tracing::warn!("SSO request carries no nonce");
        }

        let target = provider_redirect(&self.provider.login_url(), &nonce)?;
        tracing::info!("SSO request verified, redirecting to Kite login");
        Ok(target)
    }

    /// Step two. Returns the forum URL carrying the signed identity.
    pub async fn finish(&self, callback: &Callback) -> Result<Url, SsoError> {
        if callback.status != "success" {
            tracing::info!(status = %callback.status, "Kite login failed or was cancelled");
            return Err(SsoError::AuthRejected);
        }
        if callback.request_token.is_empty() || callback.nonce.is_empty() {
            tracing::warn!("Kite callback without request_token or nonce");
            return Err(SsoError::MissingParameter("Invalid auth params."));
        }

        let identity = self
            .provider
            .exchange_code(&callback.request_token, &self.config.kite_secret)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Kite session exchange failed"))?;

        let envelope = SsoEnvelope::seal(
            &outbound_payload(&callback.nonce, &identity),
            self.config.sso_secret_bytes(),
        );
        let target = relying_party_redirect(&self.config.sso_root_url, &envelope)?;
        tracing::info!(external_id = %identity.external_id, "SSO login handed back to forum");
        Ok(target)
    }
}

/// Verify an inbound envelope and return its nonce, or `""` if it has none.
pub fn inbound_nonce(envelope: &SsoEnvelope, secret: &[u8]) -> Result<String, SsoError> {
    let params = envelope.open(secret)?;
    Ok(params.get("nonce").unwrap_or_default().to_string())
}

/// Add `redirect_params=<urlencoded "nonce=...">` to the provider login URL.
/// An existing `redirect_params` is replaced; other parameters are kept.
pub fn provider_redirect(login_url: &str, nonce: &str) -> Result<Url, SsoError> {
    let mut url = Url::parse(login_url)
        .map_err(|e| SsoError::Internal(format!("invalid Kite login URL {login_url:?}: {e}")))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != REDIRECT_PARAMS)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut redirect_params = FormParams::new();
    redirect_params.append("nonce", nonce);

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(REDIRECT_PARAMS, &redirect_params.encode());
    Ok(url)
}

/// Outbound payload fields, in the order the forum receives them.
pub fn outbound_payload(nonce: &str, identity: &Identity) -> FormParams {
    let mut params = FormParams::new();
    params
        .append("nonce", nonce)
        .append("email", identity.email.as_str())
        .append("external_id", identity.external_id.as_str())
        .append("name", identity.name.as_str())
        .append("avatar_url", identity.avatar_url.as_str());
    params
}

/// `<root>/session/sso_login?sso=...&sig=...`
pub fn relying_party_redirect(root_url: &str, envelope: &SsoEnvelope) -> Result<Url, SsoError> {
    let login = format!("{}{SSO_LOGIN_PATH}", root_url.trim_end_matches('/'));
    let mut url = Url::parse(&login)
        .map_err(|e| SsoError::Internal(format!("invalid SSO_ROOT_URL {root_url:?}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("sso", &envelope.payload)
        .append_pair("sig", &envelope.signature);
    Ok(url)
}
