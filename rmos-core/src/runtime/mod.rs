// rmos-core/src/runtime/mod.rs
// ============================================================================
// Module: RMOS Runtime
// Description: Orchestrator and in-memory store backing the pipeline.
// Purpose: Drive SPEC->PLAN->DECISION->EXECUTION and persist the result.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime owns the pipeline orchestrator and an in-memory reference
//! implementation of [`crate::interfaces::ArtifactStore`]. Every external
//! interface (ingress HTTP routes, the CLI) must call through the same
//! [`orchestrator::Orchestrator`] to preserve invariants; none may write
//! artifacts directly.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod orchestrator;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use orchestrator::CreatePlanRequest;
pub use orchestrator::CreateSpecRequest;
pub use orchestrator::ExecutionResult;
pub use orchestrator::FeedbackFlags;
pub use orchestrator::Orchestrator;
pub use orchestrator::OrchestratorError;
pub use orchestrator::PlanResult;
pub use store::InMemoryArtifactStore;
pub use store::SharedArtifactStore;
