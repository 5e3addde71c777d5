// rmos-core/src/core/identifiers.rs
// ============================================================================
// Module: RMOS Identifiers
// Description: Canonical opaque identifiers for artifacts, runs, and rules.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the string-based identifiers used throughout RMOS.
//! Identifiers are opaque and serialize as strings; validation of their
//! *contents* (if any) is the caller's responsibility at the ingress boundary,
//! not of these wrapper types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Declares an opaque, transparent string identifier newtype.
macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new ", stringify!($name), ".")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

opaque_id!(ArtifactId, "Opaque, globally unique, immutable artifact identifier.");
opaque_id!(SessionId, "Session identifier shared by every artifact in a Run.");
opaque_id!(BatchLabel, "Batch label shared by every artifact in a Run.");
opaque_id!(ToolKind, "Tool identifier, e.g. `saw_batch`, `rosette`, `rmos_toolpaths`.");
opaque_id!(RuleId, "Feasibility rule identifier, e.g. `F001`.");
opaque_id!(PrincipalId, "Opaque operator or agent identifier recorded as `created_by`.");
opaque_id!(Sha256Hex, "Lowercase hex-encoded SHA-256 digest, the sole identity of a blob.");
opaque_id!(RequestId, "Opaque request correlation identifier for the ingress envelope.");
opaque_id!(MaterialId, "Material identifier used in a Machining Context.");
opaque_id!(ToolId, "Physical tool/blade/bit identifier used in a Machining Context.");
opaque_id!(MachineProfileId, "Machine profile identifier used in a Machining Context.");
opaque_id!(ProjectId, "Project identifier used in a Machining Context.");
opaque_id!(OperationKind, "Operation kind used to key Learning Overrides.");

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use super::ArtifactId;

    #[test]
    fn round_trips_through_string_conversions() {
        let id = ArtifactId::from("art_0001");
        assert_eq!(id.as_str(), "art_0001");
        assert_eq!(id.to_string(), "art_0001");
        let owned: ArtifactId = String::from("art_0002").into();
        assert_eq!(owned.as_str(), "art_0002");
    }

    #[test]
    fn serializes_as_transparent_string() {
        let id = ArtifactId::new("art_xyz");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"art_xyz\"");
        let back: ArtifactId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
