// rmos-core/src/core/time.rs
// ============================================================================
// Module: RMOS Clock
// Description: Injected wall-clock abstraction for artifact timestamps.
// Purpose: Keep timestamp assignment out of caller control and out of ambient
//          global state, while remaining deterministic under test.
// Dependencies: time
// ============================================================================

//! ## Overview
//! RMOS never lets a caller supply `created_at_utc` directly: the store alone
//! assigns it, at the moment an artifact is accepted. To keep that assignment
//! testable and to avoid reaching for ambient wall-clock reads scattered
//! through the codebase, time is obtained through an injected [`Clock`]
//! rather than a direct call to `OffsetDateTime::now_utc()`. Production code
//! wires up [`SystemClock`]; tests wire up a fixed clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Clock Trait
// ============================================================================

/// Supplies the current UTC instant used to stamp artifacts on acceptance.
///
/// Implementors must be monotonic-enough for audit purposes but are not
/// required to be monotonic in the strict `Instant` sense; RMOS timestamps
/// are advisory metadata, not a causal ordering mechanism — ordering is
/// carried by parent links, not by clock values.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now_utc(&self) -> OffsetDateTime;
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// [`Clock`] implementation backed by the operating system's wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

// ============================================================================
// SECTION: Formatting Helpers
// ============================================================================

/// Errors raised while formatting or parsing RMOS timestamps.
#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    /// RFC 3339 formatting failed.
    #[error("failed to format timestamp: {0}")]
    Format(String),
    /// RFC 3339 parsing failed.
    #[error("failed to parse timestamp: {0}")]
    Parse(String),
}

/// Formats an instant as an RFC 3339 string, the wire format for
/// `created_at_utc` on every artifact.
///
/// # Errors
///
/// Returns [`TimeError::Format`] if the underlying formatter fails.
pub fn to_rfc3339(instant: OffsetDateTime) -> Result<String, TimeError> {
    instant
        .format(&Rfc3339)
        .map_err(|err| TimeError::Format(err.to_string()))
}

/// Parses an RFC 3339 string into an instant.
///
/// # Errors
///
/// Returns [`TimeError::Parse`] if the string is not valid RFC 3339.
pub fn from_rfc3339(value: &str) -> Result<OffsetDateTime, TimeError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|err| TimeError::Parse(err.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;

    struct FixedClock(OffsetDateTime);

    impl Clock for FixedClock {
        fn now_utc(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[test]
    fn system_clock_reports_recent_time() {
        let clock = SystemClock;
        let now = clock.now_utc();
        assert!(now.unix_timestamp() > 0);
    }

    #[test]
    fn fixed_clock_is_stable_across_reads() {
        let instant = from_rfc3339("2026-01-01T00:00:00Z").expect("parse");
        let clock = FixedClock(instant);
        assert_eq!(clock.now_utc(), clock.now_utc());
    }

    #[test]
    fn rfc3339_round_trips() {
        let instant = from_rfc3339("2026-03-05T12:30:00Z").expect("parse");
        let text = to_rfc3339(instant).expect("format");
        let parsed = from_rfc3339(&text).expect("reparse");
        assert_eq!(instant, parsed);
    }
}
