//! Process configuration, read once at startup from flags or environment.

use clap::Parser;

#[derive(Parser, Clone)]
#[command(
    name = "kite-sso-broker",
    about = "DiscourseConnect SSO provider that authenticates users with Kite Connect"
)]
pub struct Config {
    /// Root URL of the Discourse forum, e.g. https://forum.example.com
    #[arg(long, env = "SSO_ROOT_URL")]
    pub sso_root_url: String,

    /// DiscourseConnect shared secret
    #[arg(long, env = "SSO_SECRET", hide_env_values = true)]
    pub sso_secret: String,

    /// Kite Connect API key
    #[arg(long, env = "KITE_KEY")]
    pub kite_key: String,

    /// Kite Connect API secret
    #[arg(long, env = "KITE_SECRET", hide_env_values = true)]
    pub kite_secret: String,

    /// Listen address. A bare `:port` binds all interfaces.
    #[arg(long, env = "KITE_ADDRESS", default_value = ":9000")]
    pub listen_addr: String,

    /// Kite Connect login page
    #[arg(long, env = "KITE_LOGIN_URL", default_value = "https://kite.zerodha.com/connect/login")]
    pub kite_login_url: String,

    /// Kite Connect API root
    #[arg(long, env = "KITE_API_ROOT", default_value = "https://api.kite.trade")]
    pub kite_api_root: String,

    /// Timeout for the Kite session exchange, in seconds
    #[arg(long, env = "KITE_TIMEOUT_SECS", default_value_t = 10)]
    pub kite_timeout_secs: u64,

    /// Emit JSON logs (1/true/yes/on)
    #[arg(long, env = "KITE_SSO_LOG_JSON", value_parser = clap::builder::BoolishValueParser::new())]
    pub log_json: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing env vars: {0}")]
    Missing(String),
    #[error("SSO_ROOT_URL is not a valid URL: {0}")]
    InvalidRootUrl(String),
}

impl Config {
    /// Reject empty required values. clap only guarantees presence.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("SSO_ROOT_URL", &self.sso_root_url),
            ("SSO_SECRET", &self.sso_secret),
            ("KITE_KEY", &self.kite_key),
            ("KITE_SECRET", &self.kite_secret),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing.join(" / ")));
        }

        url::Url::parse(&self.sso_root_url)
            .map_err(|e| ConfigError::InvalidRootUrl(e.to_string()))?;
        Ok(())
    }

    pub fn sso_secret_bytes(&self) -> &[u8] {
        self.sso_secret.as_bytes()
    }

    /// Socket address to bind. `:9000` becomes `0.0.0.0:9000`.
    pub fn bind_addr(&self) -> String {
        if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sso_root_url", &self.sso_root_url)
            .field("sso_secret", &"<redacted>")
            .field("kite_key", &self.kite_key)
            .field("kite_secret", &"<redacted>")
            .field("listen_addr", &self.listen_addr)
            .field("kite_login_url", &self.kite_login_url)
            .field("kite_api_root", &self.kite_api_root)
            .field("kite_timeout_secs", &self.kite_timeout_secs)
            .field("log_json", &self.log_json)
            .finish()
    }
}
