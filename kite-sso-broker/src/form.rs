//! `application/x-www-form-urlencoded` key/value payloads.
//!
//! DiscourseConnect payloads are ordinary query strings. Encoding keeps
//! insertion order, so the outbound payload is byte-for-byte predictable.
//! Parsing is strict: bad escapes and `;` separators are errors rather than
//! being silently repaired.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("invalid semicolon separator in query")]
    Semicolon,
    #[error("invalid URL escape {0:?}")]
    BadEscape(String),
    #[error("invalid UTF-8 in {0:?}")]
    NotUtf8(String),
}

/// Ordered key/value pairs. Repeated keys are kept; `get` returns the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize in insertion order. Spaces become `+`, everything outside
    /// `[A-Za-z0-9*-._]` is percent-escaped.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(k, v)| (k, v)))
            .finish()
    }

    pub fn parse(input: &str) -> Result<Self, FormError> {
        let mut params = Self::new();
        for segment in input.split('&') {
            if segment.is_empty() {
                continue;
            }
            if segment.contains(';') {
                return Err(FormError::Semicolon);
            }
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            params.append(unescape(key)?, unescape(value)?);
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn unescape(raw: &str) -> Result<String, FormError> {
    let bytes = raw.as_bytes();
    let mut pos = 0;
    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'%') {
        let at = pos + offset;
        match bytes.get(at + 1..at + 3) {
            Some(digits) if digits.iter().all(u8::is_ascii_hexdigit) => pos = at + 3,
            _ => {
                let end = (at + 3).min(bytes.len());
                let escape = String::from_utf8_lossy(&bytes[at..end]).into_owned();
                return Err(FormError::BadEscape(escape));
            }
        }
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| FormError::NotUtf8(raw.to_string()))
}
