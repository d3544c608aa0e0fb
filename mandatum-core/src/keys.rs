//! Key Provider: the verifier's trusted key material.
//!
//! An immutable mapping from `public_key_id` to Ed25519 public key, loaded
//! once at process start from an injected map (a config file, a CI variable).
//! There is no hot reload and no network fetch inside the verification path;
//! a missing key id is an ordinary verification failure, not an error that
//! escapes to the caller.

use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Maps key identifiers to trusted public keys.
#[derive(Debug, Clone, Default)]
pub struct KeyProvider {
    keys: HashMap<String, PublicKey>,
}

impl KeyProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from `(key_id, base64_public_key)` pairs.
    pub fn from_base64_map<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut provider = Self::new();
        for (key_id, b64) in entries {
            let key_id = key_id.into();
            let key = PublicKey::from_base64(b64.as_ref()).map_err(|e| {
                Error::InvalidKeyMaterial {
                    key_id: key_id.clone(),
                    reason: e.to_string(),
                }
            })?;
            provider.register(key_id, key);
        }
        Ok(provider)
    }

    /// Build a provider from a JSON object of `{"key_id": "base64", ...}`.
    ///
    /// This is the shape the CLI accepts through its trusted-keys variable.
    pub fn from_json(raw: &str) -> Result<Self> {
        let map: HashMap<String, String> = serde_json::from_str(raw)?;
        Self::from_base64_map(map)
    }

    /// Register a trusted key under an identifier.
    ///
    /// Registration happens during startup wiring; once the provider is
    /// handed to a [`Verifier`](crate::verify::Verifier) it is shared
    /// read-only.
    pub fn register(&mut self, key_id: impl Into<String>, key: PublicKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Look up a public key by identifier.
    pub fn lookup(&self, key_id: &str) -> Option<&PublicKey> {
        self.keys.get(key_id)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the provider holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
