// rmos-ingress/src/lib.rs
// ============================================================================
// Module: RMOS Ingress
// Description: HTTP surface over the orchestration core.
// Purpose: Expose the SPEC/PLAN/DECISION/EXECUTION pipeline, the Run read
//          surface, and governance introspection as a plain `axum` service.
// Dependencies: rmos-broker, rmos-config, rmos-contract, rmos-core,
//               rmos-providers, rmos-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! Ingress exposes the orchestration core over HTTP. Every write operation
//! is a thin `axum` handler over [`rmos_core::Orchestrator`]; no handler
//! performs geometric or physical computation itself. The governance
//! middleware stamps deprecation headers from the same route registry the
//! `/api/_meta/routing-truth` endpoint reads, so the two views can never
//! drift apart.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod advisory;
pub mod audit;
pub mod error;
pub mod governance;
pub mod pipeline;
pub mod runs;
pub mod server;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::IngressError;
pub use server::ServerError;
pub use server::build_router;
pub use server::serve;
pub use state::AppState;
pub use state::StateError;
