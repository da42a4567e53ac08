use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;

use crate::{AccountId, MalformedKeyError};

// A run of exactly twelve digits, bounded by non-digits or the ends of the key.
fn account_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^0-9])([0-9]{12})(?:[^0-9]|$)").expect("account pattern compiles"))
}

// Every `%` must start a two-hex-digit escape.
fn escapes_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.iter().enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| bytes.get(i + 1..i + 3).is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)))
}

/// Decodes an object key as S3 delivers it in notifications: form-encoded,
/// so `+` is a space and `%XX` is a byte.
pub fn decode_key(raw: &str) -> Result<String, MalformedKeyError> {
    if !escapes_well_formed(raw) {
        return Err(MalformedKeyError::InvalidEncoding { key: raw.to_string() });
    }
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| MalformedKeyError::InvalidEncoding { key: raw.to_string() })
}

pub fn extract_account_id(key: &str) -> Result<AccountId, MalformedKeyError> {
    account_run()
        .captures(key)
        .and_then(|c| c.get(1))
        .map(|m| AccountId::new(m.as_str()))
        .ok_or_else(|| MalformedKeyError::MissingAccountId { key: key.to_string() })
}

/// Everything from the first `marker` to the end of `key`, marker included.
pub fn extract_partition_suffix<'k>(key: &'k str, marker: &str) -> Result<&'k str, MalformedKeyError> {
    key.find(marker)
        .filter(|_| !marker.is_empty())
        .map(|at| &key[at..])
        .ok_or_else(|| MalformedKeyError::MissingPartition { key: key.to_string(), marker: marker.to_string() })
}
