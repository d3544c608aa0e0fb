//! Canonical encoding of warrant records.
//!
//! The signature covers every field of the warrant except `signature` itself,
//! so issuer and verifier must agree on one byte form for the record. The
//! canonical form is compact JSON with object keys sorted lexicographically at
//! every nesting level, `,` and `:` as the only separators, and UTF-8 output.
//! It is a pure function of the field values: insertion order never matters,
//! array order and string casing always do.
//!
//! The encoder works on [`serde_json::Value`] rather than the typed
//! [`Warrant`](crate::warrant::Warrant) so the verifier canonicalizes the
//! record exactly as received; fields this implementation does not know about
//! are still covered by the signature instead of being silently dropped.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Canonical payload bytes for signing and hashing.
///
/// Strips the top-level `signature` field and encodes the rest canonically.
pub fn canonical_payload(record: &Value) -> Vec<u8> {
    let mut out = String::new();
    match record {
        Value::Object(map) => {
            let entries = map.iter().filter(|(key, _)| key.as_str() != "signature");
            write_object(entries, &mut out);
        }
        other => write_value(other, &mut out),
    }
    out.into_bytes()
}

/// SHA-256 digest of the canonical payload, as lowercase hex.
///
/// Printed into CI logs for auditability; carries no authorization weight.
pub fn payload_sha256(record: &Value) -> String {
    sha256_hex(&canonical_payload(record))
}

/// Lowercase hex SHA-256 of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(map.iter(), out),
    }
}

fn write_object<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>, out: &mut String) {
    // Sort here rather than trusting the map's iteration order; serde_json's
    // map type depends on the `preserve_order` feature, which any crate in
    // the build graph can switch on.
    let mut sorted: Vec<(&String, &Value)> = entries.collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in sorted.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(key, out);
        out.push(':');
        write_value(value, out);
    }
    out.push('}');
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            // Non-ASCII stays raw UTF-8; the canonical form is defined over
            // bytes, not over an ASCII-escaped projection.
            c => out.push(c),
        }
    }
    out.push('"');
}
