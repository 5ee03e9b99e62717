//! HMAC-SHA256 signatures shared with the relying party.
//!
//! Inbound envelopes are verified and outbound envelopes are signed with the
//! same secret and the same hex-encoded MAC, so `sign` and `verify` mirror
//! each other exactly.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8]) -> HmacSha256 {
    // HMAC pads or hashes the key, so no key length is rejected.
    HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length")
}

/// Lowercase hex HMAC-SHA256 of `message` under `key`.
pub fn sign(message: &[u8], key: &[u8]) -> String {
    let mut mac = keyed(key);
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex-encoded HMAC-SHA256 over the exact `message` bytes.
///
/// Signatures that are not hex, or decode to the wrong length, are simply
/// invalid. The comparison itself is constant-time.
pub fn verify(message: &[u8], key: &[u8], hex_signature: &str) -> bool {
    let Ok(signature) = hex::decode(hex_signature) else {
        return false;
    };
    let mut mac = keyed(key);
    mac.update(message);
    mac.verify_slice(&signature).is_ok()
}
