//! Audit logging infrastructure.
//!
//! Security-relevant moments (mint, verify, deny, gate verdict) are emitted
//! as structured events through a process-global logger. The default is a
//! no-op; CI entry points install [`StdoutLogger`] so events land in the job
//! log as JSON lines.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Kinds of audit events the crate emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    WarrantMinted,
    WarrantVerified,
    WarrantDenied,
    GateDecision,
}

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: AuditEventType,
    pub component: String,
    pub actor: String,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warrant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AuditEvent {
    pub fn new(event: AuditEventType, component: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            event,
            component: component.into(),
            actor: actor.into(),
            at: Utc::now(),
            warrant_id: None,
            reason: None,
            payload_sha256: None,
            details: None,
        }
    }

    pub fn with_warrant_id(mut self, id: impl Into<String>) -> Self {
        self.warrant_id = Some(id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_payload_sha256(mut self, hash: impl Into<String>) -> Self {
        self.payload_sha256 = Some(hash.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Trait for audit loggers.
pub trait AuditLogger: Send + Sync + std::fmt::Debug {
    fn log(&self, event: AuditEvent);
}

/// Writes events to stdout as JSON lines, for CI jobs and containerized
/// deployments where an external agent scrapes the stream.
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl StdoutLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for StdoutLogger {
    fn log(&self, event: AuditEvent) {
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{json}");
        } else {
            eprintln!("failed to serialize audit event: {event:?}");
        }
    }
}

/// A logger that does nothing (tests, or auditing disabled).
#[derive(Debug, Default)]
pub struct NoOpLogger;

impl AuditLogger for NoOpLogger {
    fn log(&self, _event: AuditEvent) {}
}

// Global so mint/verify call sites don't thread a logger through every
// signature. Defaults to no logger installed.
static GLOBAL_LOGGER: RwLock<Option<Arc<dyn AuditLogger>>> = RwLock::new(None);

/// Install the global audit logger.
pub fn set_global_logger(logger: Arc<dyn AuditLogger>) {
    if let Ok(mut slot) = GLOBAL_LOGGER.write() {
        *slot = Some(logger);
    }
}

/// Log an event through the global logger, if one is installed.
pub fn log_event(event: AuditEvent) {
    if let Ok(slot) = GLOBAL_LOGGER.read() {
        if let Some(logger) = slot.as_ref() {
            logger.log(event);
        }
    }
}
