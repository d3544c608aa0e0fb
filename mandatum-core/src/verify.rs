//! Warrant Verifier: the ordered validation pipeline.
//!
//! Verification is a pure function of the warrant record, the injected
//! [`KeyProvider`], the verifier's [`VerifyPolicy`], and a single clock read.
//! Each stage short-circuits with a distinct [`Reason`]; no stage is skipped
//! for a valid warrant:
//!
//! 1. algorithm check (`UNSUPPORTED_ALG`)
//! 2. temporal sanity (`EXPIRED`, `ISSUED_IN_FUTURE`, `TTL_TOO_LONG`)
//! 3. policy pinning (`POLICY_HASH_MISMATCH`)
//! 4. identity binding (`REPO_MISMATCH`, `COMMIT_MISMATCH`)
//! 5. cryptographic verification (`UNKNOWN_KEY`, `BAD_SIGNATURE`)
//!
//! The pipeline is fail-closed: malformed input is an expected, common case
//! and folds into a negative [`Decision`]; nothing below the policy gate
//! raises a fault a careless caller could catch and ignore. The only fatal
//! errors are configuration mistakes in the verifier's *own* required inputs,
//! rejected at construction time.
//!
//! Verification is deterministic for a given clock reading; there is no
//! retry logic and no replay cache (a `warrant_id` nonce store is a known
//! gap, not part of this protocol revision).

use crate::canonical;
use crate::crypto::Signature;
use crate::error::{Error, Result};
use crate::keys::KeyProvider;
use crate::warrant::{timestamp, Warrant};
use crate::wire::MAX_WARRANT_SIZE;
use crate::{DEFAULT_CLOCK_TOLERANCE_SECS, DEFAULT_MAX_TTL_SECS, SUPPORTED_SIGNATURE_ALG};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;

/// Why a verification succeeded or failed.
///
/// The serialized form is the protocol's reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    Ok,
    /// Structural failure: unparseable record, missing field, wrong type,
    /// non-monotonic timestamps.
    Malformed,
    UnsupportedAlg,
    Expired,
    IssuedInFuture,
    TtlTooLong,
    PolicyHashMismatch,
    RepoMismatch,
    CommitMismatch,
    UnknownKey,
    BadSignature,
}

impl Reason {
    /// The protocol reason code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Malformed => "MALFORMED",
            Self::UnsupportedAlg => "UNSUPPORTED_ALG",
            Self::Expired => "EXPIRED",
            Self::IssuedInFuture => "ISSUED_IN_FUTURE",
            Self::TtlTooLong => "TTL_TOO_LONG",
            Self::PolicyHashMismatch => "POLICY_HASH_MISMATCH",
            Self::RepoMismatch => "REPO_MISMATCH",
            Self::CommitMismatch => "COMMIT_MISMATCH",
            Self::UnknownKey => "UNKNOWN_KEY",
            Self::BadSignature => "BAD_SIGNATURE",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Verification outcome. Never persisted; consumed by the policy gate and
/// audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub ok: bool,
    pub reason: Reason,
    /// Hex SHA-256 of the canonical payload, present on success. Exposed for
    /// audit logs only; it carries no authorization weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_sha256: Option<String>,
}

impl Decision {
    fn allow(payload_sha256: String) -> Self {
        Self {
            ok: true,
            reason: Reason::Ok,
            payload_sha256: Some(payload_sha256),
        }
    }

    fn deny(reason: Reason) -> Self {
        Self {
            ok: false,
            reason,
            payload_sha256: None,
        }
    }
}

/// The verifier's own required inputs: what it expects to observe locally.
#[derive(Debug, Clone)]
pub struct VerifyPolicy {
    /// Hex SHA-256 the warrant's policy pin must match.
    pub expected_bundle_sha256: String,
    /// Repository identifier of the checkout the verifier runs in.
    pub observed_repo: String,
    /// Commit hash of that checkout.
    pub observed_commit_sha: String,
    /// Upper bound on `expires_at - issued_at`, in seconds.
    pub max_ttl_seconds: i64,
    /// Tolerance for `issued_at` slightly in the future, in seconds.
    pub clock_tolerance_seconds: i64,
}

impl VerifyPolicy {
    /// Policy with the default max TTL and clock tolerance.
    pub fn new(
        expected_bundle_sha256: impl Into<String>,
        observed_repo: impl Into<String>,
        observed_commit_sha: impl Into<String>,
    ) -> Self {
        Self {
            expected_bundle_sha256: expected_bundle_sha256.into(),
            observed_repo: observed_repo.into(),
            observed_commit_sha: observed_commit_sha.into(),
            max_ttl_seconds: DEFAULT_MAX_TTL_SECS,
            clock_tolerance_seconds: DEFAULT_CLOCK_TOLERANCE_SECS,
        }
    }

    pub fn with_max_ttl(mut self, max_ttl_seconds: i64) -> Self {
        self.max_ttl_seconds = max_ttl_seconds;
        self
    }

    pub fn with_clock_tolerance(mut self, clock_tolerance_seconds: i64) -> Self {
        self.clock_tolerance_seconds = clock_tolerance_seconds;
        self
    }
}

/// Runs the verification pipeline against an immutable key provider and a
/// fixed local policy. Cheap to clone, safe to share across threads.
#[derive(Debug, Clone)]
pub struct Verifier {
    keys: KeyProvider,
    policy: VerifyPolicy,
}

impl Verifier {
    /// Create a verifier.
    ///
    /// An empty expected bundle hash, repo, or commit, or a non-positive max
    /// TTL, means the surrounding system is mis-deployed; that is a fatal
    /// [`Error::Configuration`], not a deny.
    pub fn new(keys: KeyProvider, policy: VerifyPolicy) -> Result<Self> {
        if policy.expected_bundle_sha256.trim().is_empty() {
            return Err(Error::Configuration(
                "expected policy bundle hash is not configured".into(),
            ));
        }
        if policy.observed_repo.trim().is_empty() {
            return Err(Error::Configuration("observed repo is not configured".into()));
        }
        if policy.observed_commit_sha.trim().is_empty() {
            return Err(Error::Configuration(
                "observed commit sha is not configured".into(),
            ));
        }
        if policy.max_ttl_seconds <= 0 {
            return Err(Error::Configuration(format!(
                "max TTL must be positive, got {}",
                policy.max_ttl_seconds
            )));
        }
        if policy.clock_tolerance_seconds < 0 {
            return Err(Error::Configuration(format!(
                "clock tolerance must be non-negative, got {}",
                policy.clock_tolerance_seconds
            )));
        }
        Ok(Self { keys, policy })
    }

    /// The policy this verifier was constructed with.
    pub fn policy(&self) -> &VerifyPolicy {
        &self.policy
    }

    /// Verify a typed warrant.
    pub fn verify(&self, warrant: &Warrant) -> Decision {
        match warrant.to_value() {
            Ok(value) => self.verify_value(&value),
            Err(_) => Decision::deny(Reason::Malformed),
        }
    }

    /// Verify raw warrant bytes (JSON). Oversized or unparseable input is a
    /// `MALFORMED` decision, never a fault.
    pub fn verify_slice(&self, raw: &[u8]) -> Decision {
        if raw.len() > MAX_WARRANT_SIZE {
            return Decision::deny(Reason::Malformed);
        }
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => self.verify_value(&value),
            Err(_) => Decision::deny(Reason::Malformed),
        }
    }

    /// Verify a warrant record, reading the clock once.
    pub fn verify_value(&self, record: &Value) -> Decision {
        self.verify_value_at(record, Utc::now())
    }

    /// Verify a warrant record against an explicit `now`.
    ///
    /// All temporal comparisons in one verification use this single reading.
    pub fn verify_value_at(&self, record: &Value, now: DateTime<Utc>) -> Decision {
        let decision = match self.run_pipeline(record, now) {
            Ok(payload_sha256) => Decision::allow(payload_sha256),
            Err(reason) => Decision::deny(reason),
        };
        self.audit(record, &decision);
        decision
    }

    fn run_pipeline(
        &self,
        record: &Value,
        now: DateTime<Utc>,
    ) -> std::result::Result<String, Reason> {
        // Stage 1: algorithm. An absent signature block reads as an
        // unsupported (empty) algorithm.
        let alg = record
            .pointer("/signature/alg")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if alg != SUPPORTED_SIGNATURE_ALG {
            return Err(Reason::UnsupportedAlg);
        }

        // Stage 2: temporal sanity.
        let issued_at = parse_time_field(record, "issued_at")?;
        let expires_at = parse_time_field(record, "expires_at")?;
        if expires_at <= issued_at {
            return Err(Reason::Malformed);
        }
        if expires_at <= now {
            return Err(Reason::Expired);
        }
        if issued_at > now + Duration::seconds(self.policy.clock_tolerance_seconds) {
            return Err(Reason::IssuedInFuture);
        }
        if (expires_at - issued_at).num_seconds() > self.policy.max_ttl_seconds {
            return Err(Reason::TtlTooLong);
        }

        // Stage 3: policy pinning.
        let bundle = record
            .pointer("/policy/bundle_sha256")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if bundle.is_empty() || !hash_eq_ci(bundle, &self.policy.expected_bundle_sha256) {
            return Err(Reason::PolicyHashMismatch);
        }

        // Stage 4: identity binding.
        let repo = record
            .pointer("/claims/repo")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !repo.eq_ignore_ascii_case(&self.policy.observed_repo) {
            return Err(Reason::RepoMismatch);
        }
        let commit = record
            .pointer("/claims/commit_sha")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !commit.eq_ignore_ascii_case(&self.policy.observed_commit_sha) {
            return Err(Reason::CommitMismatch);
        }

        // Stage 5: cryptographic verification over the canonical encoding of
        // everything except the signature itself.
        let key_id = record
            .pointer("/signature/public_key_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let key = self.keys.lookup(key_id).ok_or(Reason::UnknownKey)?;

        let sig_b64 = record
            .pointer("/signature/sig_b64")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let signature = Signature::from_base64(sig_b64).map_err(|_| Reason::BadSignature)?;

        let payload = canonical::canonical_payload(record);
        key.verify(&payload, &signature)
            .map_err(|_| Reason::BadSignature)?;

        Ok(canonical::sha256_hex(&payload))
    }

    fn audit(&self, record: &Value, decision: &Decision) {
        let event_type = if decision.ok {
            crate::audit::AuditEventType::WarrantVerified
        } else {
            crate::audit::AuditEventType::WarrantDenied
        };
        let mut event =
            crate::audit::AuditEvent::new(event_type, "verifier", &self.policy.observed_repo)
                .with_reason(decision.reason.code());
        if let Some(id) = record.get("warrant_id").and_then(Value::as_str) {
            event = event.with_warrant_id(id);
        }
        if let Some(hash) = &decision.payload_sha256 {
            event = event.with_payload_sha256(hash.clone());
        }
        crate::audit::log_event(event);
    }
}

fn parse_time_field(record: &Value, field: &str) -> std::result::Result<DateTime<Utc>, Reason> {
    let raw = record
        .get(field)
        .and_then(Value::as_str)
        .ok_or(Reason::Malformed)?;
    timestamp::parse(raw).map_err(|_| Reason::Malformed)
}

/// Case-insensitive, constant-time hash comparison. Unequal lengths compare
/// unequal without early exit.
fn hash_eq_ci(a: &str, b: &str) -> bool {
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
