//! Cryptographic primitives for Mandatum.
//!
//! Ed25519 keys and signatures, wrapped so the rest of the crate never touches
//! `ed25519-dalek` types directly. Signatures are computed over the raw
//! canonical encoding of the warrant (see [`crate::canonical`]) so that any
//! implementation of the protocol can verify them from the wire form alone.
//!
//! Key material moves between processes as standard base64 (private keys via
//! CI secrets, public keys via the injected key map); PEM import/export is
//! provided for keys managed as files.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey as Ed25519SigningKey, Verifier, VerifyingKey,
};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use secrecy::{CloneableSecret, ExposeSecret, Secret, Zeroize};

/// A private key for minting warrants.
///
/// The inner Ed25519 key is held in a `Secret` so it is zeroized on drop and
/// redacted from `Debug` output; a signing key that leaks into CI logs is a
/// standing credential for the whole trust domain.
#[derive(Clone)]
pub struct SigningKey {
    inner: Secret<SigningKeyWrapper>,
}

// ed25519-dalek 2.x zeroizes its SigningKey on drop; the wrapper only exists
// to satisfy secrecy's trait bounds.
struct SigningKeyWrapper(Ed25519SigningKey);

impl Clone for SigningKeyWrapper {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Zeroize for SigningKeyWrapper {
    fn zeroize(&mut self) {
        // No-op: the inner key zeroizes itself on Drop.
    }
}

impl CloneableSecret for SigningKeyWrapper {}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("inner", &"***SECRET***")
            .finish()
    }
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let key = Ed25519SigningKey::generate(&mut OsRng);
        Self {
            inner: Secret::new(SigningKeyWrapper(key)),
        }
    }

    /// Create a signing key from raw secret key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: Secret::new(SigningKeyWrapper(Ed25519SigningKey::from_bytes(bytes))),
        }
    }

    /// Create a signing key from a standard-base64 secret key, as carried in
    /// a CI secret.
    pub fn from_base64(b64: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(b64.trim())
            .map_err(|e| Error::Crypto(format!("invalid base64 private key: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Crypto("private key must be 32 bytes".to_string()))?;
        Ok(Self::from_bytes(&arr))
    }

    /// Create a signing key from a PKCS#8 PEM string.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = Ed25519SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| Error::Crypto(format!("invalid PEM: {e}")))?;
        Ok(Self {
            inner: Secret::new(SigningKeyWrapper(key)),
        })
    }

    /// Get the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.inner.expose_secret().0.verifying_key(),
        }
    }

    /// Sign a message. The warrant issuer passes the canonical payload bytes.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.inner.expose_secret().0.sign(message),
        }
    }

    /// Get the raw secret key bytes.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.inner.expose_secret().0.to_bytes()
    }

    /// Encode the secret key as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.secret_key_bytes())
    }

    /// Encode the secret key as PKCS#8 PEM.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .expose_secret()
            .0
            .to_pkcs8_pem(LineEnding::LF)
            .map(|s| s.to_string())
            .map_err(|e| Error::Crypto(format!("PEM encoding failed: {e}")))
    }
}

/// A public key for verifying warrant signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)?;
        Ok(Self { verifying_key })
    }

    /// Create a public key from standard base64, as carried in the injected
    /// key-id map.
    pub fn from_base64(b64: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(b64.trim())
            .map_err(|e| Error::Crypto(format!("invalid base64 public key: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Crypto("public key must be 32 bytes".to_string()))?;
        Self::from_bytes(&arr)
    }

    /// Create a public key from a SPKI PEM string.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let verifying_key = VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| Error::Crypto(format!("invalid PEM: {e}")))?;
        Ok(Self { verifying_key })
    }

    /// Get the public key as raw bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Encode the public key as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Encode the public key as SPKI PEM.
    pub fn to_pem(&self) -> Result<String> {
        self.verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map(|s| s.to_string())
            .map_err(|e| Error::Crypto(format!("PEM encoding failed: {e}")))
    }

    /// Short fingerprint (first 16 hex chars). Usable as a default
    /// `public_key_id` and in audit logs where the full key is noise.
    pub fn fingerprint(&self) -> String {
        let bytes = self.to_bytes();
        hex::encode(&bytes[..8])
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.verifying_key
            .verify(message, &signature.inner)
            .map_err(|e| Error::Crypto(format!("signature verification failed: {e}")))
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

/// An Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: DalekSignature,
}

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self {
            inner: DalekSignature::from_bytes(bytes),
        }
    }

    /// Create a signature from standard base64, as carried in the warrant's
    /// `sig_b64` field.
    pub fn from_base64(b64: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(b64.trim())
            .map_err(|e| Error::Crypto(format!("invalid base64 signature: {e}")))?;
        let inner = DalekSignature::from_slice(&bytes)?;
        Ok(Self { inner })
    }

    /// Get the signature as raw bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }

    /// Encode the signature as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }
}
