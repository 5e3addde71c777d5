// rmos-core/src/interfaces/mod.rs
// ============================================================================
// Module: RMOS Interfaces
// Description: Backend-agnostic interfaces for the artifact store, blob
//              store, and pluggable computation engines.
// Purpose: Define the contract surfaces the orchestrator integrates through,
//          independent of any concrete backend.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how RMOS integrates with storage and computation
//! backends without embedding backend-specific details into the
//! orchestrator. Implementations must be deterministic and fail closed on
//! missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Artifact;
use crate::core::ArtifactId;
use crate::core::AttachmentKind;
use crate::core::BatchLabel;
use crate::core::FeasibilityVerdict;
use crate::core::MachiningContext;
use crate::core::SessionId;
use crate::core::Sha256Hex;
use crate::core::Stage;
use crate::core::ToolKind;

// ============================================================================
// SECTION: Artifact Store
// ============================================================================

/// Errors raised by an [`ArtifactStore`].
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    /// Underlying storage I/O failed.
    #[error("artifact store io error: {0}")]
    Io(String),
    /// An artifact with identical `(kind, parent_ids, payload_sha256)`
    /// already exists and duplicates are forbidden for this stage.
    #[error("duplicate parent: {0}")]
    DuplicateParent(String),
    /// A referenced parent artifact does not resolve.
    #[error("missing parent: {0}")]
    MissingParent(String),
    /// `batch_label`/`session_id` do not match the root SPEC's values, or
    /// another ancestry invariant was violated.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// The requested artifact does not exist.
    #[error("artifact not found: {0}")]
    NotFound(String),
    /// Store reported an otherwise-uncategorized error.
    #[error("artifact store error: {0}")]
    Store(String),
}

/// Filters accepted by [`ArtifactStore::query_artifacts`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactQuery {
    /// Restrict to a specific artifact kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Restrict to a specific stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Restrict to artifacts whose parent links include this artifact under
    /// any relationship name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_artifact_id: Option<ArtifactId>,
    /// Restrict to a session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Restrict to a batch label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_label: Option<BatchLabel>,
    /// Restrict to a tool kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_kind: Option<ToolKind>,
    /// Restrict to artifacts created at or after this RFC 3339 instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<String>,
    /// Restrict to artifacts created at or before this RFC 3339 instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<String>,
}

/// Durable, strongly-consistent store for artifacts and content-addressed
/// blobs.
///
/// Implementations must serialize writes per `(session_id, batch_label)`;
/// writes across distinct sessions may proceed in parallel. Queries must
/// observe linearizable history within their own `(session_id, batch_label)`
/// scope and order results by `(created_at_utc, artifact_id)`.
pub trait ArtifactStore: Send + Sync {
    /// Persists `artifact`, assigning no fields itself beyond what the
    /// caller has already populated (the orchestrator is responsible for
    /// stamping `created_at_utc` via a [`crate::core::Clock`] before calling
    /// this method).
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::DuplicateParent`],
    /// [`ArtifactStoreError::MissingParent`], or
    /// [`ArtifactStoreError::InvariantViolation`] per the ancestry contract;
    /// [`ArtifactStoreError::Io`] or [`ArtifactStoreError::Store`] on
    /// infrastructure failure.
    fn put_artifact(&self, artifact: Artifact) -> Result<ArtifactId, ArtifactStoreError>;

    /// Retrieves an artifact by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::NotFound`] if no such artifact exists.
    fn get_artifact(&self, artifact_id: &ArtifactId) -> Result<Artifact, ArtifactStoreError>;

    /// Returns artifacts matching `query`, ordered by
    /// `(created_at_utc, artifact_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Store`] on infrastructure failure.
    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<Artifact>, ArtifactStoreError>;

    /// Returns every EXECUTION artifact whose ancestry includes `decision_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Store`] on infrastructure failure.
    fn list_executions_for_decision(
        &self,
        decision_id: &ArtifactId,
    ) -> Result<Vec<Artifact>, ArtifactStoreError>;

    /// Returns the full parent chain from `artifact_id` back to the root
    /// SPEC, root first.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::NotFound`] if `artifact_id` does not
    /// resolve.
    fn get_lineage(&self, artifact_id: &ArtifactId) -> Result<Vec<Artifact>, ArtifactStoreError>;
}

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// Errors raised by a [`BlobStore`].
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// Underlying storage I/O failed.
    #[error("blob store io error: {0}")]
    Io(String),
    /// The requested blob does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// Store reported an otherwise-uncategorized error.
    #[error("blob store error: {0}")]
    Store(String),
}

/// One page of the paginated attachment meta-index scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaIndexPage {
    /// Matching attachment metadata entries.
    pub entries: Vec<MetaIndexEntry>,
    /// Opaque cursor to pass back in to continue the scan, if more remain.
    pub next_cursor: Option<String>,
}

/// A single meta-index entry mirroring attachment metadata for paginated
/// scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaIndexEntry {
    /// SHA-256 of the attachment.
    pub sha256: Sha256Hex,
    /// MIME type.
    pub mime: String,
    /// Closed-vocabulary attachment kind.
    pub kind: AttachmentKind,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Content-addressed, idempotent blob store with a paginated meta-index.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under its SHA-256 digest, returning that digest.
    /// Repeated insertion of identical bytes is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] or [`BlobStoreError::Store`] on
    /// infrastructure failure.
    fn put_blob(
        &self,
        bytes: &[u8],
        mime: &str,
        kind: AttachmentKind,
        filename: Option<&str>,
    ) -> Result<Sha256Hex, BlobStoreError>;

    /// Retrieves blob bytes by digest.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::NotFound`] if no blob with that digest
    /// exists.
    fn get_blob(&self, sha256: &Sha256Hex) -> Result<Vec<u8>, BlobStoreError>;

    /// Paginated scan over attachment metadata, optionally filtered by kind
    /// and/or MIME prefix.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Store`] on infrastructure failure.
    fn meta_index_query(
        &self,
        kind: Option<AttachmentKind>,
        mime_prefix: Option<&str>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<MetaIndexPage, BlobStoreError>;
}

// ============================================================================
// SECTION: Computation Engine
// ============================================================================

/// A single blob a [`ComputationEngine`] produces.
#[derive(Debug, Clone)]
pub struct ProducedBlob {
    /// Raw blob bytes.
    pub bytes: Vec<u8>,
    /// MIME type.
    pub mime: String,
    /// Descriptive filename.
    pub filename: String,
    /// Closed-vocabulary attachment kind.
    pub kind: AttachmentKind,
}

/// Output of a computation engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Blobs produced by this invocation, to be persisted as attachments.
    pub blobs: Vec<ProducedBlob>,
    /// Structured move/operation summary describing the computed output.
    pub summary: Value,
    /// Version of the engine that produced this output.
    pub engine_version: String,
}

/// Errors raised by a [`ComputationEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine raised an error while computing output.
    #[error("computation engine error: {0}")]
    Failed(String),
}

/// Pluggable computation engine invoked by the orchestrator at the EXECUTION
/// hook. Engines are pure with respect to their declared inputs;
/// non-determinism is a contract violation.
pub trait ComputationEngine: Send + Sync {
    /// Returns the tool kind this engine serves, e.g. `saw_batch`.
    fn tool_kind(&self) -> ToolKind;

    /// Invokes the engine against the given design payload, context, and
    /// feasibility verdict.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Failed`] when the engine cannot produce
    /// output; the orchestrator captures this into an EXECUTION artifact
    /// with status ERROR rather than propagating it as an infrastructure
    /// fault.
    fn invoke(
        &self,
        spec_payload: &Value,
        context: &MachiningContext,
        verdict: &FeasibilityVerdict,
    ) -> Result<EngineOutput, EngineError>;
}
