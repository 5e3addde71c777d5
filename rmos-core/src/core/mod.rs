// rmos-core/src/core/mod.rs
// ============================================================================
// Module: RMOS Core Types
// Description: Canonical artifact, feasibility, context, and feedback types.
// Purpose: Provide stable, serializable types that are the single source of
//          truth for every derived API surface (ingress, CLI).
// Dependencies: serde
// ============================================================================

//! ## Overview
//! RMOS core types define the immutable artifact model, the machining
//! context, the feasibility verdict shape, and the feedback-loop data
//! shapes. These types are the canonical source of truth for any derived
//! API surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod artifact;
pub mod attachment;
pub mod context;
pub mod feasibility;
pub mod feedback;
pub mod hashing;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifact::Artifact;
pub use artifact::ArtifactStatus;
pub use artifact::IndexMeta;
pub use artifact::ParentLinks;
pub use artifact::Stage;
pub use artifact::VersionStamps;
pub use attachment::AdvisoryInputReference;
pub use attachment::AdvisoryStatus;
pub use attachment::Attachment;
pub use attachment::AttachmentKind;
pub use attachment::ContentRef;
pub use attachment::RunRoot;
pub use context::CuttingParameters;
pub use context::MachiningContext;
pub use feasibility::Bucket;
pub use feasibility::DesignItem;
pub use feasibility::FeasibilityEngine;
pub use feasibility::FeasibilityError;
pub use feasibility::FeasibilityInput;
pub use feasibility::FeasibilityVerdict;
pub use feasibility::Severity;
pub use feasibility::Violation;
pub use feedback::JobMetrics;
pub use feedback::LearningDecision;
pub use feedback::LearningDecisionOutcome;
pub use feedback::LearningEvent;
pub use feedback::LearningMultipliers;
pub use feedback::LearningOverride;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::ArtifactId;
pub use identifiers::BatchLabel;
pub use identifiers::MachineProfileId;
pub use identifiers::MaterialId;
pub use identifiers::OperationKind;
pub use identifiers::PrincipalId;
pub use identifiers::ProjectId;
pub use identifiers::RequestId;
pub use identifiers::RuleId;
pub use identifiers::Sha256Hex;
pub use identifiers::SessionId;
pub use identifiers::ToolId;
pub use identifiers::ToolKind;
pub use time::Clock;
pub use time::SystemClock;
pub use time::TimeError;
