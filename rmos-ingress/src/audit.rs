// rmos-ingress/src/audit.rs
// ============================================================================
// Module: Governance Audit Logging
// Description: Structured audit events for deprecated-route hits.
// Purpose: Give operators a warning-level trail of legacy-lane traffic
//          without coupling the governance middleware to a logging backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every request matching a declared deprecation prefix is logged once, at
//! warning level, with `{lane, method, path, successor}`. This module is
//! intentionally lightweight so deployments can route events to their
//! preferred logging pipeline without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Event
// ============================================================================

/// A single deprecated-route hit.
#[derive(Debug, Clone, Serialize)]
pub struct GovernanceAuditEvent {
    /// Event identifier, always `"deprecated_route_hit"`.
    pub event: &'static str,
    /// Event timestamp, milliseconds since epoch.
    pub timestamp_ms: u128,
    /// Lane key of the matched deprecation entry.
    pub lane: String,
    /// HTTP method of the request.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Successor prefix clients should migrate to.
    pub successor: String,
}

impl GovernanceAuditEvent {
    /// Builds a new event with the current wall-clock timestamp.
    #[must_use]
    pub fn new(lane: impl Into<String>, method: impl Into<String>, path: impl Into<String>, successor: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "deprecated_route_hit",
            timestamp_ms,
            lane: lane.into(),
            method: method.into(),
            path: path.into(),
            successor: successor.into(),
        }
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Audit sink for governance events.
pub trait GovernanceAuditSink: Send + Sync {
    /// Records a deprecated-route hit.
    fn record(&self, event: &GovernanceAuditEvent);
}

/// Audit sink that logs JSON lines to stderr, prefixed at warning level.
pub struct StderrGovernanceAuditSink;

impl GovernanceAuditSink for StderrGovernanceAuditSink {
    fn record(&self, event: &GovernanceAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "WARN {payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileGovernanceAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileGovernanceAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl GovernanceAuditSink for FileGovernanceAuditSink {
    fn record(&self, event: &GovernanceAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink, used in tests.
pub struct NoopGovernanceAuditSink;

impl GovernanceAuditSink for NoopGovernanceAuditSink {
    fn record(&self, _event: &GovernanceAuditEvent) {}
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panics are acceptable.")]

    use super::*;

    #[test]
    fn event_carries_the_four_required_fields() {
        let event = GovernanceAuditEvent::new("legacy_art_studio_lane", "GET", "/api/art-studio/rosette/preview", "/api/art");
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["lane"], "legacy_art_studio_lane");
        assert_eq!(encoded["method"], "GET");
        assert_eq!(encoded["path"], "/api/art-studio/rosette/preview");
        assert_eq!(encoded["successor"], "/api/art");
    }

    #[test]
    fn noop_sink_never_panics() {
        let sink = NoopGovernanceAuditSink;
        sink.record(&GovernanceAuditEvent::new("legacy", "GET", "/x", "/y"));
    }
}
