//! HTTP surface: the two handshake endpoints plus a health probe.
//!
//! Routes:
//!   GET /kite/auth?sso=...&sig=...
//!     → 307 to Kite login (403 on bad signature, 400 on bad input)
//!   GET /kite/auth/finish?status=...&request_token=...&nonce=...
//!     → 307 to <forum>/session/sso_login?sso=...&sig=... (400 on failure)

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::envelope::SsoEnvelope;
use crate::error::SsoError;
use crate::handshake::{Broker, Callback};

pub fn router(broker: Arc<Broker>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/kite/auth", get(auth_init))
        .route("/kite/auth/finish", get(auth_finish))
        .layer(TraceLayer::new_for_http())
        .with_state(broker)
}

#[derive(Deserialize)]
struct AuthInitQuery {
    sso: Option<String>,
    sig: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

async fn auth_init(
    Query(q): Query<AuthInitQuery>,
    State(broker): State<Arc<Broker>>,
) -> Result<Redirect, SsoError> {
    let envelope = SsoEnvelope::from_query(q.sso, q.sig)?;
    let target = broker.begin(&envelope)?;
    Ok(Redirect::temporary(target.as_str()))
}

async fn auth_finish(
    Query(callback): Query<Callback>,
    State(broker): State<Arc<Broker>>,
) -> Result<Redirect, SsoError> {
    let target = broker.finish(&callback).await?;
    Ok(Redirect::temporary(target.as_str()))
}
