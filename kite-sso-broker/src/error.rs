//! Request-terminal errors of the SSO handshake.
//!
//! Every variant ends the request. Nothing is retried; the user restarts the
//! handshake from the forum.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum SsoError {
    /// A required query parameter was absent or empty.
    #[error("{0}")]
    MissingParameter(&'static str),
    /// The payload was not base64, or not a URL-encoded form.
    #[error("{0}")]
    MalformedPayload(String),
    /// Signature mismatch or non-hex signature.
    #[error("Invalid or expired request.")]
    InvalidSignature,
    /// The user cancelled, or Kite reported a non-success status.
    #[error("Auth failed or was cancelled.")]
    AuthRejected,
    #[error("Error getting Kite session: {0}. Retry.")]
    ProviderExchange(#[from] ProviderError),
    /// Misconfiguration only noticed while serving a request. The detail is
    /// logged, not returned.
    #[error("Internal error.")]
    Internal(String),
}

impl SsoError {
    pub fn status(&self) -> StatusCode {
        match self {
            SsoError::InvalidSignature => StatusCode::FORBIDDEN,
            SsoError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SsoError::MissingParameter(_)
            | SsoError::MalformedPayload(_)
            | SsoError::AuthRejected
            | SsoError::ProviderExchange(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for SsoError {
    fn into_response(self) -> Response {
        if let SsoError::Internal(ref detail) = self {
            tracing::error!(%detail, "SSO handshake failed on misconfiguration");
        }
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(SsoError::InvalidSignature.status(), StatusCode::FORBIDDEN);
        assert_eq!(SsoError::MissingParameter("Invalid params.").status(), StatusCode::BAD_REQUEST);
        assert_eq!(SsoError::MalformedPayload("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(SsoError::AuthRejected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SsoError::ProviderExchange(ProviderError::Decode("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SsoError::Internal("bad url".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = SsoError::Internal("KITE_LOGIN_URL is not a URL".into());
        assert_eq!(err.to_string(), "Internal error.");
    }

    #[test]
    fn provider_message_is_echoed() {
        let err = SsoError::from(ProviderError::Api {
            error_type: "TokenException".into(),
            message: "Token is invalid or has expired.".into(),
        });
        assert_eq!(
            err.to_string(),
            "Error getting Kite session: Token is invalid or has expired. (TokenException). Retry."
        );
    }

    #[test]
    fn response_is_plain_text() {
        let resp = SsoError::InvalidSignature.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert_eq!(content_type, "text/plain; charset=utf-8");
    }
}
