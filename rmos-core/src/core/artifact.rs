// rmos-core/src/core/artifact.rs
// ============================================================================
// Module: RMOS Artifact Model
// Description: Immutable, parent-linked artifact records and stage contracts.
// Purpose: Define the write-once entity that every authoritative state change
//          in the pipeline produces.
// Dependencies: serde, std::collections::BTreeMap
// ============================================================================

//! ## Overview
//! Every authoritative state change in RMOS is an immutable [`Artifact`].
//! Artifacts are never mutated after acceptance; amendments are expressed as
//! new artifacts carrying back-pointers in [`ParentLinks`]. This module
//! defines the artifact shape, its stage vocabulary, and the stage contract
//! table (required parent links and permitted transitions) that the
//! orchestrator enforces.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::identifiers::ArtifactId;
use super::identifiers::BatchLabel;
use super::identifiers::PrincipalId;
use super::identifiers::SessionId;
use super::identifiers::ToolKind;

// ============================================================================
// SECTION: Stage
// ============================================================================

/// Pipeline stage an artifact occupies.
///
/// The final token of an artifact's `kind` encodes this stage (e.g.
/// `saw_batch_plan` is stage [`Stage::Plan`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Root pipeline stage capturing the design request.
    Spec,
    /// Derived from a SPEC; carries the feasibility verdict.
    Plan,
    /// Derived from a PLAN; records the operator's accept/reject choice.
    Decision,
    /// Derived from an APPROVED DECISION; materializes machine output.
    Execution,
    /// Derived from an EXECUTION; records operator-observable job outcomes.
    JobLog,
    /// Derived from an EXECUTION; aggregates metrics, not authoritative.
    Rollup,
    /// Derived from a JOB_LOG; a candidate parameter-adjustment observation.
    LearningEvent,
    /// Derived from a LEARNING_EVENT; the operator's accept/reject choice.
    LearningDecision,
}

impl Stage {
    /// Returns the stage that must precede this one as a direct parent, or
    /// `None` for [`Stage::Spec`], which is the pipeline root.
    #[must_use]
    pub const fn required_predecessor(self) -> Option<Self> {
        match self {
            Self::Spec => None,
            Self::Plan => Some(Self::Spec),
            Self::Decision => Some(Self::Plan),
            Self::Execution => Some(Self::Decision),
            Self::JobLog | Self::Rollup => Some(Self::Execution),
            Self::LearningEvent => Some(Self::JobLog),
            Self::LearningDecision => Some(Self::LearningEvent),
        }
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Lifecycle status of an artifact. The valid subset is stage-specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactStatus {
    /// Freshly written, no further disposition recorded.
    Created,
    /// Operation completed successfully.
    Ok,
    /// Operation halted by a hard policy gate.
    Blocked,
    /// Operation raised an error; the chain is not advanced.
    Error,
    /// A DECISION accepted by its approver.
    Approved,
    /// A DECISION rejected by its approver.
    Rejected,
}

// ============================================================================
// SECTION: Parent Links
// ============================================================================

/// Mapping from relationship name (e.g. `parent_spec_artifact_id`) to the
/// parent artifact it references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentLinks(BTreeMap<String, ArtifactId>);

impl ParentLinks {
    /// Creates an empty parent-link set (valid only for SPEC artifacts).
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a named parent link, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, relationship: impl Into<String>, parent: ArtifactId) -> Self {
        self.0.insert(relationship.into(), parent);
        self
    }

    /// Looks up a parent link by relationship name.
    #[must_use]
    pub fn get(&self, relationship: &str) -> Option<&ArtifactId> {
        self.0.get(relationship)
    }

    /// Returns `true` if no parent links are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(relationship, artifact_id)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArtifactId)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ============================================================================
// SECTION: Index Metadata
// ============================================================================

/// Index metadata propagated from the root SPEC to every descendant.
///
/// `tool_kind`, `batch_label`, and `session_id` are required on every
/// artifact; additional keys may be carried for query convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Identifies which tool lane produced this Run, e.g. `saw_batch`.
    pub tool_kind: ToolKind,
    /// Batch label shared by every artifact in the Run.
    pub batch_label: BatchLabel,
    /// Session identifier shared by every artifact in the Run.
    pub session_id: SessionId,
    /// Operator or agent that approved the governing DECISION, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<PrincipalId>,
}

impl IndexMeta {
    /// Creates the root index metadata for a new SPEC.
    #[must_use]
    pub const fn root(tool_kind: ToolKind, batch_label: BatchLabel, session_id: SessionId) -> Self {
        Self {
            tool_kind,
            batch_label,
            session_id,
            approved_by: None,
        }
    }

    /// Derives descendant index metadata, inheriting the Run's identity.
    #[must_use]
    pub fn inherit(&self) -> Self {
        self.clone()
    }
}

// ============================================================================
// SECTION: Version Stamps
// ============================================================================

/// Version stamps enabling drift detection between PLAN and EXECUTION.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamps {
    /// Version of the computation engine that produced this artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    /// Version of the post-processor applied to engine output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_processor_version: Option<String>,
    /// Hash of the effective configuration in force when this artifact was
    /// produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_fingerprint: Option<String>,
}

// ============================================================================
// SECTION: Artifact
// ============================================================================

/// Immutable, parent-linked record of a single authoritative state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Opaque, globally unique, immutable identifier.
    pub artifact_id: ArtifactId,
    /// Closed-vocabulary kind, e.g. `saw_batch_plan`.
    pub kind: String,
    /// Pipeline stage this artifact occupies.
    pub stage: Stage,
    /// RFC 3339 instant assigned by the store on acceptance.
    pub created_at_utc: String,
    /// Operator or agent identifier; required on DECISION artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<PrincipalId>,
    /// Named parent artifact references.
    pub parent_ids: ParentLinks,
    /// Index metadata propagated from the root SPEC.
    pub index_meta: IndexMeta,
    /// SHA-256 of the canonical payload bytes.
    pub payload_sha256: String,
    /// Version stamps for drift detection.
    #[serde(default)]
    pub version_stamps: VersionStamps,
    /// Lifecycle status; the valid subset is stage-specific.
    pub status: ArtifactStatus,
    /// Free-form, closed-schema-per-kind payload body.
    pub payload: Value,
}

impl Artifact {
    /// Returns the parent of the given relationship name, if present.
    #[must_use]
    pub fn parent(&self, relationship: &str) -> Option<&ArtifactId> {
        self.parent_ids.get(relationship)
    }
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
    fn stage_predecessor_chain_matches_the_stage_contract_table() {
        assert_eq!(Stage::Spec.required_predecessor(), None);
        assert_eq!(Stage::Plan.required_predecessor(), Some(Stage::Spec));
        assert_eq!(Stage::Decision.required_predecessor(), Some(Stage::Plan));
        assert_eq!(Stage::Execution.required_predecessor(), Some(Stage::Decision));
        assert_eq!(Stage::JobLog.required_predecessor(), Some(Stage::Execution));
        assert_eq!(Stage::Rollup.required_predecessor(), Some(Stage::Execution));
    }

    #[test]
    fn parent_links_round_trip_through_json() {
        let links = ParentLinks::new().with("parent_spec_artifact_id", ArtifactId::new("art_1"));
        let json = serde_json::to_string(&links).expect("serialize");
        let back: ParentLinks = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(
            back.get("parent_spec_artifact_id"),
            Some(&ArtifactId::new("art_1"))
        );
    }

    #[test]
    fn index_meta_inherit_preserves_run_identity() {
        let root = IndexMeta::root(
            ToolKind::new("saw_batch"),
            BatchLabel::new("b1"),
            SessionId::new("s1"),
        );
        let child = root.inherit();
        assert_eq!(child.batch_label, root.batch_label);
        assert_eq!(child.session_id, root.session_id);
    }
}
