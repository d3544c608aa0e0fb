//! Error types for Mandatum.
//!
//! The verification path never surfaces these: a bad warrant folds into a
//! negative [`Decision`](crate::verify::Decision) with a reason code. `Error`
//! covers the remaining, genuinely exceptional cases: an issuer asked to mint
//! from incomplete inputs, unusable key material, and configuration mistakes
//! in the verifier's own required inputs (which should abort startup, not be
//! tolerated as a deny).

use thiserror::Error;

/// Result type alias for Mandatum operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Mandatum operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required issuer input is absent. The issuer never emits a
    /// partially-populated warrant.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Cryptographic operation failed (bad key bytes, signing failure).
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Key material for a provider entry could not be decoded.
    #[error("invalid key material for '{key_id}': {reason}")]
    InvalidKeyMaterial { key_id: String, reason: String },

    /// The surrounding system is mis-deployed: a verifier or gate was
    /// constructed without one of its own required inputs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialized warrant exceeds the wire size limit.
    #[error("payload size {size} bytes exceeds maximum {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Requested TTL is not a positive number of seconds.
    #[error("invalid TTL: {0}")]
    InvalidTtl(String),

    /// Unrecognized gate mode string.
    #[error("invalid gate mode '{0}' (expected strict, warn, or off)")]
    InvalidGateMode(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        Error::Crypto(e.to_string())
    }
}
