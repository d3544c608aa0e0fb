//! Policy Gate: turns a verification decision into ALLOW / DENY / DEFER.
//!
//! The minimal form allows an action only when the decision is positive and
//! the warrant's scope names exactly the requested action and target;
//! everything else denies. A fuller policy engine, when one is deployed, is
//! injected as a [`PolicyEngine`] at startup, never probed for at runtime,
//! and may additionally defer. With no engine installed the gate is exactly
//! the minimal form.
//!
//! The gate has three operating modes. `strict` (the default) stops the run
//! on anything but ALLOW. `warn` proceeds but logs the failure loudly, marked
//! so it can never be confused with strict output. `off` skips verification
//! entirely and exists for local, non-production runs only.

use crate::audit::{log_event, AuditEvent, AuditEventType};
use crate::error::Error;
use crate::verify::Decision;
use crate::warrant::Scope;
use serde::Serialize;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    Deny,
    /// Reserved for an installed policy engine; also reported when the gate
    /// is off and no decision was rendered at all.
    Defer,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
            Self::Defer => "DEFER",
        };
        f.write_str(s)
    }
}

/// Fail-closed operating mode, selected by the caller at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    #[default]
    Strict,
    Warn,
    Off,
}

impl GateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Warn => "warn",
            Self::Off => "off",
        }
    }
}

impl FromStr for GateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "warn" => Ok(Self::Warn),
            "off" => Ok(Self::Off),
            other => Err(Error::InvalidGateMode(other.to_string())),
        }
    }
}

/// The action an agent runner is about to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: String,
    pub target: String,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
        }
    }
}

/// Capability interface for an external, fuller policy engine.
///
/// Consulted only after the minimal checks pass; it may narrow ALLOW to DENY
/// or DEFER but is never asked to rescue a failed verification.
pub trait PolicyEngine: Send + Sync + std::fmt::Debug {
    fn decide(&self, scope: &Scope, decision: &Decision, request: &ActionRequest) -> Verdict;
}

/// What the gate told the caller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    pub verdict: Verdict,
    /// Whether the enclosing run should continue.
    pub proceed: bool,
}

/// Combines a verified decision with a requested action.
#[derive(Debug, Default)]
pub struct PolicyGate {
    mode: GateMode,
    engine: Option<Box<dyn PolicyEngine>>,
}

impl PolicyGate {
    /// Gate in strict mode with no external engine.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: GateMode) -> Self {
        Self { mode, engine: None }
    }

    /// Install an external policy engine.
    pub fn with_engine(mut self, engine: Box<dyn PolicyEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Render a verdict for the requested action.
    pub fn evaluate(&self, scope: &Scope, decision: &Decision, request: &ActionRequest) -> Verdict {
        if !decision.ok {
            return Verdict::Deny;
        }
        if scope.action != request.action || scope.target != request.target {
            return Verdict::Deny;
        }
        match &self.engine {
            Some(engine) => engine.decide(scope, decision, request),
            None => Verdict::Allow,
        }
    }

    /// Render a verdict and apply the operating mode.
    pub fn enforce(&self, scope: &Scope, decision: &Decision, request: &ActionRequest) -> GateOutcome {
        let outcome = match self.mode {
            GateMode::Off => {
                warn!(
                    mode = "off",
                    action = %request.action,
                    target = %request.target,
                    "policy gate is OFF: verification skipped (local/non-production only)"
                );
                GateOutcome {
                    verdict: Verdict::Defer,
                    proceed: true,
                }
            }
            GateMode::Strict => {
                let verdict = self.evaluate(scope, decision, request);
                if verdict == Verdict::Allow {
                    info!(mode = "strict", target = %request.target, "policy gate: ALLOW");
                } else {
                    error!(
                        mode = "strict",
                        verdict = %verdict,
                        reason = decision.reason.code(),
                        target = %request.target,
                        "policy gate: aborting run"
                    );
                }
                GateOutcome {
                    verdict,
                    proceed: verdict == Verdict::Allow,
                }
            }
            GateMode::Warn => {
                let verdict = self.evaluate(scope, decision, request);
                if verdict != Verdict::Allow {
                    warn!(
                        mode = "warn",
                        verdict = %verdict,
                        reason = decision.reason.code(),
                        target = %request.target,
                        "policy gate: verification failed, PROCEEDING ANYWAY (warn mode)"
                    );
                }
                GateOutcome {
                    verdict,
                    proceed: true,
                }
            }
        };

        log_event(
            AuditEvent::new(AuditEventType::GateDecision, "gate", self.mode.as_str())
                .with_reason(decision.reason.code())
                .with_details(format!(
                    "verdict={} proceed={} action={} target={}",
                    outcome.verdict, outcome.proceed, request.action, request.target
                )),
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Reason;

    fn scope() -> Scope {
        Scope {
            action: "run_agent".to_string(),
            target: "GrantFinder-001".to_string(),
            module: "agents".to_string(),
            permissions_intent: vec!["out:write".to_string()],
        }
    }

    fn ok_decision() -> Decision {
        Decision {
            ok: true,
            reason: Reason::Ok,
            payload_sha256: Some("00".repeat(32)),
        }
    }

    fn deny_decision() -> Decision {
        Decision {
            ok: false,
            reason: Reason::BadSignature,
            payload_sha256: None,
        }
    }

    fn request() -> ActionRequest {
        ActionRequest::new("run_agent", "GrantFinder-001")
    }

    #[test]
    fn test_minimal_form_allows_matching_scope() {
        let gate = PolicyGate::new();
        assert_eq!(
            gate.evaluate(&scope(), &ok_decision(), &request()),
            Verdict::Allow
        );
    }

    #[test]
    fn test_denies_failed_decision() {
        let gate = PolicyGate::new();
        assert_eq!(
            gate.evaluate(&scope(), &deny_decision(), &request()),
            Verdict::Deny
        );
    }

    #[test]
    fn test_denies_scope_mismatch_even_when_ok() {
        let gate = PolicyGate::new();
        let wrong_target = ActionRequest::new("run_agent", "SocialMedia-001");
        assert_eq!(
            gate.evaluate(&scope(), &ok_decision(), &wrong_target),
            Verdict::Deny
        );
        let wrong_action = ActionRequest::new("delete_repo", "GrantFinder-001");
        assert_eq!(
            gate.evaluate(&scope(), &ok_decision(), &wrong_action),
            Verdict::Deny
        );
    }

    #[test]
    fn test_strict_mode_blocks_on_deny() {
        let gate = PolicyGate::with_mode(GateMode::Strict);
        let outcome = gate.enforce(&scope(), &deny_decision(), &request());
        assert_eq!(outcome.verdict, Verdict::Deny);
        assert!(!outcome.proceed);

        let outcome = gate.enforce(&scope(), &ok_decision(), &request());
        assert_eq!(outcome.verdict, Verdict::Allow);
        assert!(outcome.proceed);
    }

    #[test]
    fn test_warn_mode_proceeds_on_deny() {
        let gate = PolicyGate::with_mode(GateMode::Warn);
        let outcome = gate.enforce(&scope(), &deny_decision(), &request());
        assert_eq!(outcome.verdict, Verdict::Deny);
        assert!(outcome.proceed);
    }

    #[test]
    fn test_off_mode_skips_verification() {
        let gate = PolicyGate::with_mode(GateMode::Off);
        let outcome = gate.enforce(&scope(), &deny_decision(), &request());
        assert_eq!(outcome.verdict, Verdict::Defer);
        assert!(outcome.proceed);
    }

    #[test]
    fn test_default_mode_is_strict() {
        assert_eq!(PolicyGate::new().mode(), GateMode::Strict);
        assert_eq!(GateMode::default(), GateMode::Strict);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(GateMode::from_str("strict").unwrap(), GateMode::Strict);
        assert_eq!(GateMode::from_str("WARN").unwrap(), GateMode::Warn);
        assert_eq!(GateMode::from_str(" off ").unwrap(), GateMode::Off);
        assert!(GateMode::from_str("lenient").is_err());
    }

    #[derive(Debug)]
    struct DeferEverything;

    impl PolicyEngine for DeferEverything {
        fn decide(&self, _: &Scope, _: &Decision, _: &ActionRequest) -> Verdict {
            Verdict::Defer
        }
    }

    #[test]
    fn test_installed_engine_may_defer() {
        let gate = PolicyGate::new().with_engine(Box::new(DeferEverything));
        assert_eq!(
            gate.evaluate(&scope(), &ok_decision(), &request()),
            Verdict::Defer
        );
        // The engine is never consulted for a failed decision.
        assert_eq!(
            gate.evaluate(&scope(), &deny_decision(), &request()),
            Verdict::Deny
        );
    }
}
