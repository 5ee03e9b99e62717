//! Identity provider boundary.
//!
//! The handshake only needs two things from the provider: where to send the
//! user to log in, and a way to trade the one-time `request_token` from the
//! login callback for the user's identity. [`crate::kite::KiteClient`] is the
//! production implementation; tests plug in fakes.

use async_trait::async_trait;

/// Identity claims handed back to the relying party. Lives only for the
/// duration of one callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with an error envelope.
    #[error("{message} ({error_type})")]
    Api { error_type: String, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Base login URL. The handshake appends its own query parameters.
    fn login_url(&self) -> String;

    /// Exchange a one-time request token for the user's identity.
    ///
    /// Called at most once per callback; the token is spent either way.
    async fn exchange_code(
        &self,
        request_token: &str,
        api_secret: &str,
    ) -> Result<Identity, ProviderError>;
}
