//! Audit trail for routing decisions.
//!
//! Every orchestration stage emits an [`AuditEvent`]. Payloads are redacted
//! when the event is constructed: any object key in [`PII_KEYS`], at any
//! depth, has its value replaced by [`REDACTION_MARKER`]. Sinks are
//! fire-and-forget and cannot fail into the caller.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Keys whose values never leave the process.
pub const PII_KEYS: [&str; 5] = ["dna_id", "mrn", "name", "email", "phone"];

/// Replacement for redacted values.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Target used by [`TracingAuditSink`].
pub const AUDIT_TARGET: &str = "biolink::audit";

/// Orchestration stages that are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Final intent chosen for the message.
    IntentRouted,
    /// Specialist selected for the intent.
    AgentSelected,
    /// Specialist finished.
    AgentCompleted,
    /// Specialist result forwarded to the medical agent.
    AgentHandoff,
}

impl AuditEventType {
    /// Snake-case event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IntentRouted => "intent_routed",
            Self::AgentSelected => "agent_selected",
            Self::AgentCompleted => "agent_completed",
            Self::AgentHandoff => "agent_handoff",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The stage that produced the event.
    pub event_type: AuditEventType,
    /// Emission time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied request identifier.
    pub request_id: String,
    /// Redacted stage data.
    pub payload: Value,
}

impl AuditEvent {
    /// Creates an event, redacting `payload`.
    #[must_use]
    pub fn new(
        event_type: AuditEventType,
        request_id: impl Into<String>,
        mut payload: Value,
    ) -> Self {
        redact(&mut payload);
        Self {
            event_type,
            timestamp: Utc::now(),
            request_id: request_id.into(),
            payload,
        }
    }
}

/// Replaces PII values in place, recursing into objects and arrays.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if is_pii_key(key) {
                    *inner = Value::String(REDACTION_MARKER.to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

fn is_pii_key(key: &str) -> bool {
    PII_KEYS.iter().any(|pii| pii.eq_ignore_ascii_case(key))
}

/// Receives audit events.
pub trait AuditSink: Send + Sync {
    /// Records `event`. Must not panic or block for long.
    fn emit(&self, event: AuditEvent);
}

/// Writes each event as one JSON line through `tracing` on
/// [`AUDIT_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => info!(target: AUDIT_TARGET, event_type = %event.event_type, "{line}"),
            Err(e) => info!(
                target: AUDIT_TARGET,
                event_type = %event.event_type,
                error = %e,
                "unserializable audit event"
            ),
        }
    }
}

/// Keeps events in memory, for tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event types so far, in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<AuditEventType> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.event_type)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
