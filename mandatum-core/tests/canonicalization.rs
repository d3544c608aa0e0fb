//! Canonical encoding properties over real minted warrants.
//!
//! The module-level unit tests cover the encoder on synthetic values; these
//! exercise the determinism guarantees the signing path actually depends on.

use mandatum_core::canonical::{canonical_payload, payload_sha256, sha256_hex};
use mandatum_core::crypto::SigningKey;
use mandatum_core::{Claims, Warrant};
use serde_json::Value;

fn issuer_key() -> SigningKey {
    SigningKey::from_bytes(&[5u8; 32])
}

fn mint() -> Warrant {
    Warrant::builder()
        .issuer("stegverse-ci")
        .public_key_id("ci-signer-1")
        .agent("GrantFinder-001")
        .policy_bundle("abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abc1")
        .claims(Claims::for_run("org/repo", "deadbeef"))
        .issue(&issuer_key())
        .unwrap()
}

#[test]
fn encoding_is_stable_across_serialization_cycles() {
    let warrant = mint();
    let value = warrant.to_value().unwrap();
    let first = canonical_payload(&value);

    // Through a JSON print-and-reparse cycle the field set and values are
    // unchanged, so the canonical bytes must be too.
    let reparsed: Value = serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
    assert_eq!(first, canonical_payload(&reparsed));

    // And through the typed round trip.
    let typed: Warrant = serde_json::from_value(value).unwrap();
    assert_eq!(first, canonical_payload(&typed.to_value().unwrap()));
}

#[test]
fn encoding_ignores_field_order_on_the_wire() {
    let warrant = mint();
    let compact = serde_json::to_string(&warrant.to_value().unwrap()).unwrap();

    // Rebuild the record with top-level fields in reverse order.
    let original: Value = serde_json::from_str(&compact).unwrap();
    let mut reversed = serde_json::Map::new();
    let obj = original.as_object().unwrap();
    for (key, value) in obj.iter().rev() {
        reversed.insert(key.clone(), value.clone());
    }
    let reversed = Value::Object(reversed);

    assert_eq!(canonical_payload(&original), canonical_payload(&reversed));
}

#[test]
fn signature_field_never_signed() {
    let warrant = mint();
    let signed = warrant.to_value().unwrap();

    let mut unsigned = warrant.clone();
    unsigned.signature = None;
    let unsigned = unsigned.to_value().unwrap();

    assert_eq!(canonical_payload(&signed), canonical_payload(&unsigned));
}

#[test]
fn any_value_change_changes_the_digest() {
    let warrant = mint();
    let base = warrant.to_value().unwrap();
    let base_hash = payload_sha256(&base);

    let mutations: Vec<(&str, Value)> = vec![
        ("warrant_id", Value::String("w-other".into())),
        ("issuer", Value::String("other-ci".into())),
    ];
    for (field, replacement) in mutations {
        let mut mutated = base.clone();
        mutated[field] = replacement;
        assert_ne!(base_hash, payload_sha256(&mutated), "field {field}");
    }

    let mut mutated = base.clone();
    mutated["claims"]["actor"] = Value::String("mallory".into());
    assert_ne!(base_hash, payload_sha256(&mutated));

    // A signature swap does NOT change the payload digest: the digest names
    // the signed content, not the attestation over it.
    let mut resigned = base;
    resigned["signature"]["sig_b64"] = Value::String("AAAA".into());
    assert_eq!(base_hash, payload_sha256(&resigned));
}

#[test]
fn digest_matches_decision_payload_hash() {
    let warrant = mint();
    let expected = sha256_hex(&canonical_payload(&warrant.to_value().unwrap()));
    assert_eq!(warrant.payload_sha256().unwrap(), expected);
}
