//! Signed DiscourseConnect envelopes: `sso` (base64 of a URL-encoded form)
//! plus `sig` (hex HMAC-SHA256 of the base64 text).

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};

use crate::error::SsoError;
use crate::form::FormParams;
use crate::signature;

/// Decoder for verified inbound payloads. Padding is still required, but
/// non-zero trailing bits are accepted.
const INBOUND: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoEnvelope {
    pub payload: String,
    pub signature: String,
}

impl SsoEnvelope {
    /// Take `sso`/`sig` as they arrived on the query string. Both must be
    /// present and non-empty.
    pub fn from_query(payload: Option<String>, signature: Option<String>) -> Result<Self, SsoError> {
        match (payload, signature) {
            (Some(payload), Some(signature)) if !payload.is_empty() && !signature.is_empty() => {
                Ok(Self { payload, signature })
            }
            _ => Err(SsoError::MissingParameter("Invalid params.")),
        }
    }

    /// Encode and sign `params` for the relying party.
    pub fn seal(params: &FormParams, secret: &[u8]) -> Self {
        let payload = STANDARD.encode(params.encode());
        let signature = signature::sign(payload.as_bytes(), secret);
        Self { payload, signature }
    }

    /// Verify the signature over the payload exactly as received, and only
    /// then decode it. Line breaks from MIME-wrapped base64 are dropped
    /// after verification.
    pub fn open(&self, secret: &[u8]) -> Result<FormParams, SsoError> {
        if !signature::verify(self.payload.as_bytes(), secret, &self.signature) {
            return Err(SsoError::InvalidSignature);
        }

        let unwrapped: String = self
            .payload
            .chars()
            .filter(|c| !matches!(c, '\r' | '\n'))
            .collect();
        let raw = INBOUND
            .decode(unwrapped)
            .map_err(|e| SsoError::MalformedPayload(format!("Error decoding payload: {e}")))?;
        let text = String::from_utf8(raw)
            .map_err(|e| SsoError::MalformedPayload(format!("Error decoding payload: {e}")))?;
        FormParams::parse(&text).map_err(|e| {
            SsoError::MalformedPayload(format!("Error parsing payload query params: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"d836444a9e4084d5b224a60c208dce14";

    #[test]
    fn sealed_envelope_opens() {
        let params: FormParams = [("nonce", "abc123"), ("email", "a@b.com")].into_iter().collect();
        let envelope = SsoEnvelope::seal(&params, SECRET);
        assert_eq!(envelope.open(SECRET).unwrap(), params);
    }

    #[test]
    fn seal_signs_base64_text() {
        let params: FormParams = [("nonce", "abc123")].into_iter().collect();
        let envelope = SsoEnvelope::seal(&params, SECRET);
        assert_eq!(envelope.payload, "bm9uY2U9YWJjMTIz");
        assert_eq!(envelope.signature, signature::sign(b"bm9uY2U9YWJjMTIz", SECRET));
    }

    #[test]
    fn missing_or_empty_parts() {
        for (sso, sig) in [
            (None, Some("ab".to_string())),
            (Some("bm9uY2U9YWJjMTIz".to_string()), None),
            (Some(String::new()), Some("ab".to_string())),
            (Some("bm9uY2U9YWJjMTIz".to_string()), Some(String::new())),
            (None, None),
        ] {
            assert!(matches!(
                SsoEnvelope::from_query(sso, sig),
                Err(SsoError::MissingParameter(_))
            ));
        }
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let params: FormParams = [("nonce", "abc123")].into_iter().collect();
        let envelope = SsoEnvelope::seal(&params, SECRET);
        assert!(matches!(envelope.open(b"other"), Err(SsoError::InvalidSignature)));
    }

    #[test]
    fn signature_covers_received_bytes_not_decoded_form() {
        // A lenient decoder would read both texts as `nonce=abc`.
        let canonical = "bm9uY2U9YWJj";
        let sig = signature::sign(canonical.as_bytes(), SECRET);
        let other = SsoEnvelope {
            payload: "bm9uY2U9YWJj\n".to_string(),
            signature: sig,
        };
        assert!(matches!(other.open(SECRET), Err(SsoError::InvalidSignature)));
    }

    fn signed(payload: &str) -> SsoEnvelope {
        SsoEnvelope {
            payload: payload.to_string(),
            signature: signature::sign(payload.as_bytes(), SECRET),
        }
    }

    #[test]
    fn mime_wrapped_payload_opens() {
        let params = signed("bm9uY2U9\nYWJjMTIz\n").open(SECRET).unwrap();
        assert_eq!(params.get("nonce"), Some("abc123"));

        let params = signed("bm9uY2U9\r\nYWJjMTIz\r\n").open(SECRET).unwrap();
        assert_eq!(params.get("nonce"), Some("abc123"));
    }

    #[test]
    fn non_zero_trailing_bits_are_accepted() {
        let params = signed("bm9uY2U9YR==").open(SECRET).unwrap();
        assert_eq!(params.get("nonce"), Some("a"));
    }

    #[test]
    fn verified_but_not_base64() {
        let payload = "not*base64!".to_string();
        let envelope = SsoEnvelope {
            signature: signature::sign(payload.as_bytes(), SECRET),
            payload,
        };
        let err = envelope.open(SECRET).unwrap_err();
        assert!(matches!(err, SsoError::MalformedPayload(_)));
        assert!(err.to_string().starts_with("Error decoding payload"));
    }

    #[test]
    fn verified_but_not_a_form() {
        let payload = STANDARD.encode("nonce=%zz");
        let envelope = SsoEnvelope {
            signature: signature::sign(payload.as_bytes(), SECRET),
            payload,
        };
        let err = envelope.open(SECRET).unwrap_err();
        assert!(err.to_string().starts_with("Error parsing payload query params"));
    }

    #[test]
    fn bad_signature_checked_before_decoding() {
        let envelope = SsoEnvelope {
            payload: "not*base64!".to_string(),
            signature: "00".repeat(32),
        };
        assert!(matches!(envelope.open(SECRET), Err(SsoError::InvalidSignature)));
    }
}
