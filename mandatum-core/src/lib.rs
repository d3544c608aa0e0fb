//! # Mandatum Core
//!
//! Execution warrants for automated agent runs.
//!
//! A warrant is a short-lived, Ed25519-signed capability grant that authorizes
//! one agent execution in one observed context: a repository at a specific
//! commit, under a pinned policy bundle. The issuer mints the warrant inside
//! the trusted side of a CI pipeline; the verifier checks it against what it
//! can observe locally and renders a [`Decision`] that a policy gate turns
//! into ALLOW / DENY / DEFER.
//!
//! ## Key Concepts
//!
//! - **Warrant**: a signed record binding an agent run to repo, commit, and
//!   policy bundle hash, valid for a bounded TTL
//! - **Canonical encoding**: the unique byte form of the record (minus its
//!   signature) that is hashed and signed
//! - **Identity binding**: a warrant only verifies in the exact repo/commit it
//!   was minted for
//! - **Fail-closed**: every malformed or mismatched input becomes a negative
//!   decision, never an escaped fault
//!
//! ## Example
//!
//! ```rust,ignore
//! use mandatum_core::{Claims, KeyProvider, Verifier, VerifyPolicy, Warrant};
//! use mandatum_core::crypto::SigningKey;
//!
//! let key = SigningKey::generate();
//!
//! let warrant = Warrant::builder()
//!     .issuer("stegverse-ci")
//!     .public_key_id("ci-signer-1")
//!     .agent("GrantFinder-001")
//!     .policy_bundle("9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")
//!     .claims(Claims::for_run("org/repo", "deadbeef"))
//!     .issue(&key)?;
//!
//! let mut keys = KeyProvider::new();
//! keys.register("ci-signer-1", key.public_key());
//!
//! let verifier = Verifier::new(
//!     keys,
//!     VerifyPolicy::new(
//!         "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
//!         "org/repo",
//!         "deadbeef",
//!     ),
//! )?;
//!
//! let decision = verifier.verify(&warrant);
//! assert!(decision.ok);
//! ```

pub mod audit;
pub mod canonical;
pub mod ci;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod keys;
pub mod receipt;
pub mod verify;
pub mod warrant;
pub mod wire;

// Re-exports for convenience
pub use crypto::{PublicKey, Signature, SigningKey};
pub use error::{Error, Result};
pub use gate::{ActionRequest, GateMode, GateOutcome, PolicyEngine, PolicyGate, Verdict};
pub use keys::KeyProvider;
pub use verify::{Decision, Reason, Verifier, VerifyPolicy};
pub use warrant::{Claims, Policy, Scope, SignatureBlock, Subject, Warrant, WarrantBuilder};
pub use wire::MAX_WARRANT_SIZE;

/// The only signature algorithm the protocol accepts.
pub const SUPPORTED_SIGNATURE_ALG: &str = "ed25519";

/// Default warrant lifetime granted by the issuer, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 600;

/// Default upper bound the verifier places on `expires_at - issued_at`.
///
/// A warrant with a longer lifetime is rejected outright, regardless of how
/// much of that lifetime remains.
pub const DEFAULT_MAX_TTL_SECS: i64 = 900;

/// Clock skew tolerance applied to the `issued_at` check, in seconds.
///
/// CI runners and the verifying host do not share a clock. A warrant whose
/// `issued_at` is up to this far in the future is still accepted; anything
/// beyond it is rejected as `ISSUED_IN_FUTURE`. Expiry is checked strictly,
/// with no tolerance.
pub const DEFAULT_CLOCK_TOLERANCE_SECS: i64 = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_verify() {
        let key = SigningKey::generate();

        let warrant = Warrant::builder()
            .issuer("ci")
            .public_key_id("k1")
            .agent("GrantFinder-001")
            .policy_bundle("abc123")
            .claims(Claims::for_run("org/repo", "deadbeef"))
            .issue(&key)
            .unwrap();

        let mut keys = KeyProvider::new();
        keys.register("k1", key.public_key());

        let verifier =
            Verifier::new(keys, VerifyPolicy::new("abc123", "org/repo", "deadbeef")).unwrap();

        let decision = verifier.verify(&warrant);
        assert!(decision.ok, "expected OK, got {:?}", decision.reason);
        assert!(decision.payload_sha256.is_some());
    }
}
