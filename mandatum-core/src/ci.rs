//! CI environment claim collection.
//!
//! The issuer runs inside a CI job and records what that job can observe
//! about itself. This module gathers those facts from the conventional
//! GitHub Actions variables, with generic fallbacks for other hosts. It is
//! deliberately trivial: field collection only, no validation beyond
//! trimming; the issuer decides what is required.

use crate::warrant::Claims;

/// Facts observed from the hosting CI environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub host_platform: String,
    pub repo: String,
    pub git_ref: String,
    pub commit_sha: String,
    pub run_id: String,
    pub workflow: String,
    pub actor: String,
}

impl CiContext {
    /// Collect from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Collect through an arbitrary lookup function. `from_env` in
    /// production; a map in tests.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let first = |a: &str, b: &str| {
            let v = var(a);
            if v.is_empty() {
                var(b)
            } else {
                v
            }
        };

        let host_platform = {
            let v = var("HOST_PLATFORM");
            if v.is_empty() {
                "github".to_string()
            } else {
                v
            }
        };

        Self {
            host_platform,
            repo: first("GITHUB_REPOSITORY", "REPO"),
            git_ref: var("GITHUB_REF"),
            commit_sha: first("GITHUB_SHA", "COMMIT_SHA"),
            run_id: var("GITHUB_RUN_ID"),
            workflow: var("GITHUB_WORKFLOW"),
            actor: var("GITHUB_ACTOR"),
        }
    }

    /// Whether the binding fields the issuer requires are present.
    pub fn is_complete(&self) -> bool {
        !self.repo.is_empty() && !self.commit_sha.is_empty()
    }

    /// Convert into warrant claims.
    pub fn claims(&self) -> Claims {
        Claims {
            host_platform: self.host_platform.clone(),
            repo: self.repo.clone(),
            git_ref: self.git_ref.clone(),
            commit_sha: self.commit_sha.clone(),
            run_id: self.run_id.clone(),
            workflow: self.workflow.clone(),
            actor: self.actor.clone(),
        }
    }
}
