// rmos-core/src/core/attachment.rs
// ============================================================================
// Module: RMOS Attachment Model
// Description: Content-addressed blob metadata and advisory input references.
// Purpose: Model the Attachment and Advisory Input Reference entities.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Attachment`] is a content-addressed binary asset; `sha256` is its
//! sole identity. An [`AdvisoryInputReference`] is an append-only record
//! linking a Run to a canonical advisory payload stored as an Attachment —
//! it is metadata, never authority.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use super::identifiers::ArtifactId;
use super::identifiers::RequestId;
use super::identifiers::Sha256Hex;

// ============================================================================
// SECTION: Attachment Kind
// ============================================================================

/// Closed vocabulary of attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Machine-ready G-code output.
    GcodeOutput,
    /// DXF geometry input.
    DxfInput,
    /// Raw CAM plan payload.
    CamPlan,
    /// Advisory (non-authoritative) payload.
    AdvisoryPayload,
    /// JOB_LOG payload blob.
    JobLog,
}

// ============================================================================
// SECTION: Attachment
// ============================================================================

/// Content-addressed binary asset. `sha256` is the sole identity; `filename`
/// and `mime` are descriptive only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Primary identity: lowercase-hex SHA-256 of `bytes`.
    pub sha256: Sha256Hex,
    /// MIME type, descriptive only.
    pub mime: String,
    /// Original filename, descriptive only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Closed-vocabulary kind.
    pub kind: AttachmentKind,
}

// ============================================================================
// SECTION: Advisory Status
// ============================================================================

/// Status of an advisory attachment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvisoryStatus {
    /// The attachment job is in flight (async producers only).
    Pending,
    /// The attachment is resolvable in the blob store.
    Ready,
    /// The attachment job failed; never surfaced on the authoritative Run.
    Failed,
}

// ============================================================================
// SECTION: Advisory Input Reference
// ============================================================================

/// Append-only record linking a Run to a canonical advisory payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryInputReference {
    /// SHA-256 of the referenced attachment.
    pub sha256: Sha256Hex,
    /// Closed-vocabulary attachment kind.
    pub kind: AttachmentKind,
    /// Opaque producer identifier (AI sandbox or human).
    pub producer_id: String,
    /// Request correlation identifier.
    pub request_id: RequestId,
    /// RFC 3339 instant assigned by the store on acceptance.
    pub created_at_utc: String,
    /// Current resolution status.
    pub status: AdvisoryStatus,
}

/// The Run an [`AdvisoryInputReference`] is attached to, identified by its
/// root SPEC artifact.
pub type RunRoot = ArtifactId;

// ============================================================================
// SECTION: Content Reference
// ============================================================================

/// A caller-supplied pointer to externally produced content, resolved and
/// hash-verified before it is admitted into the blob store as an
/// [`Attachment`].
///
/// `uri` scheme determines which registered source resolves it (e.g.
/// `file:` or `inline:`); `sha256` is the caller's declared digest and must
/// match the digest of the resolved bytes or resolution fails closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    /// URI identifying where to resolve the content from.
    pub uri: String,
    /// Caller-declared SHA-256 of the referenced content.
    pub sha256: Sha256Hex,
    /// MIME type of the referenced content.
    pub mime: String,
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;

    #[test]
    fn advisory_reference_serializes_with_pending_status() {
        let reference = AdvisoryInputReference {
            sha256: Sha256Hex::new("a".repeat(64)),
            kind: AttachmentKind::AdvisoryPayload,
            producer_id: "ai-sandbox-1".to_string(),
            request_id: RequestId::new("req_1"),
            created_at_utc: "2026-01-01T00:00:00Z".to_string(),
            status: AdvisoryStatus::Pending,
        };
        let json = serde_json::to_string(&reference).expect("serialize");
        assert!(json.contains("\"PENDING\""));
    }
}
