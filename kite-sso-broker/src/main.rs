use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kite_sso_broker::config::Config;
use kite_sso_broker::handshake::Broker;
use kite_sso_broker::kite::KiteClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // JSON logs in production (KITE_SSO_LOG_JSON=1), human-readable otherwise
    let filter = EnvFilter::from_default_env().add_directive("kite_sso_broker=info".parse()?);
    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    }

    config.validate()?;
    tracing::debug!(?config, "Loaded configuration");

    let kite = KiteClient::from_config(&config).context("building Kite client")?;
    let addr = config.bind_addr();
    let broker = Arc::new(Broker::new(config, Arc::new(kite)));
    let app = kite_sso_broker::web::router(broker);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Kite SSO broker listening (KITE_ADDRESS)");
    axum::serve(listener, app).await?;
    Ok(())
}
