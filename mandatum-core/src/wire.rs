//! Wire helpers for warrant records.
//!
//! The wire format is the JSON shape of [`Warrant`]; warrants travel through
//! CI environment variables or job outputs, so a URL-safe base64 form is
//! provided for transports that dislike raw JSON.
//!
//! Decoding enforces [`MAX_WARRANT_SIZE`] before parsing so an oversized blob
//! is rejected without allocating a tree for it.

use crate::error::{Error, Result};
use crate::warrant::Warrant;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Maximum allowed size for a serialized warrant in bytes (64 KB).
///
/// Typical warrants are under 1 KB; the cap only exists to bound what an
/// attacker can make the verifier parse.
pub const MAX_WARRANT_SIZE: usize = 64 * 1024;

/// Environment variable the CLIs use to carry a base64 warrant between the
/// mint step and the verify step of a pipeline.
pub const WARRANT_ENV: &str = "MANDATUM_WARRANT";

/// Serialize a warrant to compact JSON.
pub fn to_json(warrant: &Warrant) -> Result<String> {
    serde_json::to_string(warrant).map_err(Error::from)
}

/// Serialize a warrant to human-readable JSON with sorted keys, the form the
/// mint CLI prints for CI logs.
pub fn to_json_pretty(warrant: &Warrant) -> Result<String> {
    let value = warrant.to_value()?;
    serde_json::to_string_pretty(&sort_keys(value)).map_err(Error::from)
}

/// Parse a warrant from JSON bytes, enforcing the size limit first.
pub fn from_json_slice(data: &[u8]) -> Result<Warrant> {
    if data.len() > MAX_WARRANT_SIZE {
        return Err(Error::PayloadTooLarge {
            size: data.len(),
            max: MAX_WARRANT_SIZE,
        });
    }
    serde_json::from_slice(data).map_err(Error::from)
}

/// Parse a warrant from a JSON string.
pub fn from_json_str(raw: &str) -> Result<Warrant> {
    from_json_slice(raw.as_bytes())
}

/// Encode a warrant as URL-safe base64 JSON for env-var transport.
pub fn encode_base64(warrant: &Warrant) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(to_json(warrant)?))
}

/// Decode a warrant from URL-safe base64 JSON.
pub fn decode_base64(s: &str) -> Result<Warrant> {
    // base64 packs 3 bytes into 4 chars, so this lower bound rejects
    // oversized input before decoding.
    let estimated = (s.len() / 4) * 3;
    if estimated > MAX_WARRANT_SIZE {
        return Err(Error::PayloadTooLarge {
            size: estimated,
            max: MAX_WARRANT_SIZE,
        });
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(s.trim())
        .map_err(|e| Error::Serialization(format!("invalid base64 warrant: {e}")))?;
    from_json_slice(&bytes)
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect::<serde_json::Map<_, _>>()
                .into()
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}
