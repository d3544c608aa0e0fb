//! Warrant type, the core primitive of Mandatum.
//!
//! A warrant is a short-lived token of authority containing:
//! - A subject (which execution context is authorized)
//! - A scope (what the agent may do there)
//! - A policy pin (the exact policy bundle it was minted against)
//! - Claims (observable facts about the originating CI run)
//! - A signature proving provenance (who minted it)
//!
//! A warrant is minted once, transmitted out-of-band, verified exactly once
//! per execution attempt, and discarded. It carries no mutable state.

use crate::canonical;
use crate::crypto::SigningKey;
use crate::error::{Error, Result};
use crate::{DEFAULT_TTL_SECS, SUPPORTED_SIGNATURE_ALG};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default module path recorded in the scope when none is supplied.
pub const DEFAULT_MODULE: &str = "agents";

/// The execution context a warrant authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Kind of context, e.g. `workflow_run`.
    #[serde(rename = "type")]
    pub subject_type: String,
    /// Composite context id, e.g. `github:org/repo:agents:12345678`.
    pub id: String,
    /// Free-form annotation, informational only.
    #[serde(default)]
    pub notes: String,
}

/// What the warrant authorizes within the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub action: String,
    pub target: String,
    pub module: String,
    pub permissions_intent: Vec<String>,
}

/// The policy pin: the exact policy bundle the warrant was minted against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Lowercase hex SHA-256 of the policy bundle.
    pub bundle_sha256: String,
}

/// Observable facts about the originating execution, used for identity
/// binding. `repo` and `commit_sha` are the load-bearing fields; the rest
/// exist for audit trails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub host_platform: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commit_sha: String,
    pub run_id: String,
    pub workflow: String,
    pub actor: String,
}

impl Claims {
    /// Claims for a run where only the binding fields are known.
    pub fn for_run(repo: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            host_platform: "github".to_string(),
            repo: repo.into(),
            commit_sha: commit_sha.into(),
            ..Self::default()
        }
    }
}

/// Detached signature block. Excluded from the canonically encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    pub alg: String,
    pub public_key_id: String,
    pub sig_b64: String,
}

/// A signed execution warrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warrant {
    pub warrant_id: String,
    #[serde(with = "timestamp")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub expires_at: DateTime<Utc>,
    pub issuer: String,
    pub subject: Subject,
    pub scope: Scope,
    pub policy: Policy,
    pub claims: Claims,
    /// Present on anything the issuer emits; `None` only for the transient
    /// unsigned record inside the minting procedure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureBlock>,
}

impl Warrant {
    /// Create a new warrant builder.
    pub fn builder() -> WarrantBuilder {
        WarrantBuilder::new()
    }

    /// The warrant as a JSON value, the form the wire and the canonical
    /// encoder work on.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// SHA-256 hex of this warrant's canonical payload.
    pub fn payload_sha256(&self) -> Result<String> {
        Ok(canonical::payload_sha256(&self.to_value()?))
    }
}

/// Second-precision ISO-8601 UTC timestamps (`2026-08-06T12:00:00Z`).
///
/// Seconds are the protocol's resolution: sub-second digits would make the
/// canonical encoding depend on how a given clock source rounds.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse an ISO-8601 timestamp, accepting both `Z` and numeric offsets.
    pub fn parse(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
    }
}

/// Builder for minting warrants.
///
/// Required: issuer identity, `public_key_id`, agent name, policy bundle hash,
/// and claims carrying a repo and commit. Anything missing is a hard error;
/// the issuer never emits a partially-populated warrant.
#[derive(Debug)]
pub struct WarrantBuilder {
    warrant_id: Option<String>,
    issuer: Option<String>,
    public_key_id: Option<String>,
    agent: Option<String>,
    module: Option<String>,
    action: String,
    permissions_intent: Vec<String>,
    bundle_sha256: Option<String>,
    claims: Option<Claims>,
    notes: String,
    ttl_seconds: i64,
}

impl WarrantBuilder {
    pub fn new() -> Self {
        Self {
            warrant_id: None,
            issuer: None,
            public_key_id: None,
            agent: None,
            module: None,
            action: "run_agent".to_string(),
            permissions_intent: vec!["out:write".to_string()],
            bundle_sha256: None,
            claims: None,
            notes: "Ephemeral execution warrant".to_string(),
            ttl_seconds: DEFAULT_TTL_SECS,
        }
    }

    /// Explicit warrant id. When absent, one is derived from the mint time,
    /// run id, and agent name, plus a random suffix for per-mint uniqueness.
    pub fn warrant_id(mut self, id: impl Into<String>) -> Self {
        self.warrant_id = Some(id.into());
        self
    }

    /// Identity string of the minting authority.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Identifier the verifier uses to look up the issuer's public key.
    pub fn public_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.public_key_id = Some(key_id.into());
        self
    }

    /// Agent the warrant authorizes; becomes `scope.target`.
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Module path recorded in the scope.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Scope action (defaults to `run_agent`).
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Replace the declared permissions intent (defaults to `["out:write"]`).
    pub fn permissions_intent(mut self, intent: impl IntoIterator<Item = String>) -> Self {
        self.permissions_intent = intent.into_iter().collect();
        self
    }

    /// Hex SHA-256 of the policy bundle the warrant is pinned to.
    pub fn policy_bundle(mut self, bundle_sha256: impl Into<String>) -> Self {
        self.bundle_sha256 = Some(bundle_sha256.into());
        self
    }

    /// Claims observed from the originating execution.
    pub fn claims(mut self, claims: Claims) -> Self {
        self.claims = Some(claims);
        self
    }

    /// Subject annotation.
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Warrant lifetime in seconds (defaults to [`DEFAULT_TTL_SECS`]).
    pub fn ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Assemble, canonically encode, and sign the warrant.
    pub fn issue(self, key: &SigningKey) -> Result<Warrant> {
        let issuer = self.issuer.ok_or(Error::MissingField("issuer".into()))?;
        let public_key_id = self
            .public_key_id
            .ok_or(Error::MissingField("public_key_id".into()))?;
        let agent = self.agent.ok_or(Error::MissingField("agent".into()))?;
        let bundle_sha256 = self
            .bundle_sha256
            .ok_or(Error::MissingField("policy.bundle_sha256".into()))?;
        let claims = self.claims.ok_or(Error::MissingField("claims".into()))?;

        if claims.repo.is_empty() {
            return Err(Error::MissingField("claims.repo".into()));
        }
        if claims.commit_sha.is_empty() {
            return Err(Error::MissingField("claims.commit_sha".into()));
        }
        if self.ttl_seconds <= 0 {
            return Err(Error::InvalidTtl(format!(
                "{} seconds (must be positive)",
                self.ttl_seconds
            )));
        }

        let issued_at = Utc::now().trunc_subsecs(0);
        let expires_at = issued_at + Duration::seconds(self.ttl_seconds);

        let warrant_id = self
            .warrant_id
            .unwrap_or_else(|| default_warrant_id(issued_at, &claims.run_id, &agent));

        let subject_type = if claims.host_platform == "github" {
            "workflow_run"
        } else {
            "execution"
        };
        let subject = Subject {
            subject_type: subject_type.to_string(),
            id: format!(
                "{}:{}:{}:{}",
                claims.host_platform, claims.repo, claims.workflow, claims.run_id
            ),
            notes: self.notes,
        };

        let mut warrant = Warrant {
            warrant_id,
            issued_at,
            expires_at,
            issuer,
            subject,
            scope: Scope {
                action: self.action,
                target: agent,
                module: self.module.unwrap_or_else(|| DEFAULT_MODULE.to_string()),
                permissions_intent: self.permissions_intent,
            },
            policy: Policy { bundle_sha256 },
            claims,
            signature: None,
        };

        let payload = canonical::canonical_payload(&warrant.to_value()?);
        let signature = key.sign(&payload);
        warrant.signature = Some(SignatureBlock {
            alg: SUPPORTED_SIGNATURE_ALG.to_string(),
            public_key_id,
            sig_b64: signature.to_base64(),
        });

        crate::audit::log_event(
            crate::audit::AuditEvent::new(
                crate::audit::AuditEventType::WarrantMinted,
                "issuer",
                &warrant.issuer,
            )
            .with_warrant_id(&warrant.warrant_id)
            .with_payload_sha256(canonical::sha256_hex(&payload))
            .with_details(format!(
                "agent={} ttl={}s repo={}",
                warrant.scope.target, self.ttl_seconds, warrant.claims.repo
            )),
        );

        Ok(warrant)
    }
}

impl Default for WarrantBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_warrant_id(issued_at: DateTime<Utc>, run_id: &str, agent: &str) -> String {
    let run = if run_id.is_empty() { "local" } else { run_id };
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}-{}", issued_at.timestamp(), run, agent, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn minimal_builder() -> WarrantBuilder {
        Warrant::builder()
            .issuer("stegverse-ci")
            .public_key_id("ci-signer-1")
            .agent("GrantFinder-001")
            .policy_bundle("abc123")
            .claims(Claims::for_run("org/repo", "deadbeef"))
    }

    #[test]
    fn test_issue_populates_all_fields() {
        let warrant = minimal_builder().issue(&test_key()).unwrap();

        assert!(!warrant.warrant_id.is_empty());
        assert_eq!(warrant.issuer, "stegverse-ci");
        assert_eq!(warrant.subject.subject_type, "workflow_run");
        assert_eq!(warrant.scope.action, "run_agent");
        assert_eq!(warrant.scope.target, "GrantFinder-001");
        assert_eq!(warrant.scope.permissions_intent, vec!["out:write"]);
        assert_eq!(warrant.policy.bundle_sha256, "abc123");
        assert_eq!(
            warrant.expires_at - warrant.issued_at,
            Duration::seconds(DEFAULT_TTL_SECS)
        );

        let sig = warrant.signature.as_ref().unwrap();
        assert_eq!(sig.alg, "ed25519");
        assert_eq!(sig.public_key_id, "ci-signer-1");
    }

    #[test]
    fn test_signature_verifies_over_canonical_payload() {
        let key = test_key();
        let warrant = minimal_builder().issue(&key).unwrap();

        let payload = canonical::canonical_payload(&warrant.to_value().unwrap());
        let sig = crate::crypto::Signature::from_base64(
            &warrant.signature.as_ref().unwrap().sig_b64,
        )
        .unwrap();
        assert!(key.public_key().verify(&payload, &sig).is_ok());
    }

    #[test]
    fn test_missing_required_inputs_are_hard_failures() {
        let cases: Vec<(WarrantBuilder, &str)> = vec![
            (
                Warrant::builder()
                    .public_key_id("k")
                    .agent("a")
                    .policy_bundle("h")
                    .claims(Claims::for_run("r", "c")),
                "issuer",
            ),
            (
                Warrant::builder()
                    .issuer("i")
                    .agent("a")
                    .policy_bundle("h")
                    .claims(Claims::for_run("r", "c")),
                "public_key_id",
            ),
            (
                Warrant::builder()
                    .issuer("i")
                    .public_key_id("k")
                    .policy_bundle("h")
                    .claims(Claims::for_run("r", "c")),
                "agent",
            ),
            (
                Warrant::builder()
                    .issuer("i")
                    .public_key_id("k")
                    .agent("a")
                    .claims(Claims::for_run("r", "c")),
                "policy.bundle_sha256",
            ),
            (
                Warrant::builder()
                    .issuer("i")
                    .public_key_id("k")
                    .agent("a")
                    .policy_bundle("h"),
                "claims",
            ),
        ];

        for (builder, field) in cases {
            match builder.issue(&test_key()) {
                Err(Error::MissingField(f)) => assert_eq!(f, field),
                other => panic!("expected MissingField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_binding_claims_rejected() {
        let result = minimal_builder()
            .claims(Claims::for_run("", "deadbeef"))
            .issue(&test_key());
        assert!(matches!(result, Err(Error::MissingField(f)) if f == "claims.repo"));

        let result = minimal_builder()
            .claims(Claims::for_run("org/repo", ""))
            .issue(&test_key());
        assert!(matches!(result, Err(Error::MissingField(f)) if f == "claims.commit_sha"));
    }

    #[test]
    fn test_nonpositive_ttl_rejected() {
        assert!(matches!(
            minimal_builder().ttl_seconds(0).issue(&test_key()),
            Err(Error::InvalidTtl(_))
        ));
        assert!(matches!(
            minimal_builder().ttl_seconds(-5).issue(&test_key()),
            Err(Error::InvalidTtl(_))
        ));
    }

    #[test]
    fn test_default_warrant_ids_unique_per_mint() {
        let key = test_key();
        let a = minimal_builder().issue(&key).unwrap();
        let b = minimal_builder().issue(&key).unwrap();
        assert_ne!(a.warrant_id, b.warrant_id);
    }

    #[test]
    fn test_explicit_warrant_id_kept() {
        let warrant = minimal_builder()
            .warrant_id("w-explicit")
            .issue(&test_key())
            .unwrap();
        assert_eq!(warrant.warrant_id, "w-explicit");
    }

    #[test]
    fn test_timestamps_are_second_precision_utc() {
        let warrant = minimal_builder().issue(&test_key()).unwrap();
        let value = warrant.to_value().unwrap();

        let issued = value["issued_at"].as_str().unwrap();
        assert!(issued.ends_with('Z'), "expected Z suffix, got {issued}");
        assert!(!issued.contains('.'), "expected no subseconds, got {issued}");

        let round_tripped: Warrant = serde_json::from_value(value).unwrap();
        assert_eq!(round_tripped.issued_at, warrant.issued_at);
    }

    #[test]
    fn test_non_github_host_gets_execution_subject() {
        let mut claims = Claims::for_run("org/repo", "deadbeef");
        claims.host_platform = "gitlab".to_string();
        let warrant = minimal_builder().claims(claims).issue(&test_key()).unwrap();
        assert_eq!(warrant.subject.subject_type, "execution");
    }
}
