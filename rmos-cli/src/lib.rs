// rmos-cli/src/lib.rs
// ============================================================================
// Module: RMOS CLI Library
// Description: Shared helpers for the RMOS command-line interface.
// Purpose: House the routing-truth comparison logic so it is unit-testable
//          independent of the `clap` entry point.
// Dependencies: rmos-contract
// ============================================================================

//! ## Overview
//! The CLI binary (`src/main.rs`) is a thin `clap` dispatcher over the
//! functions in this crate: starting the ingress server and checking the
//! checked-in routing-truth snapshot against what the running router would
//! report.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod routing_truth;

pub use routing_truth::RoutingTruthCheckError;
pub use routing_truth::check_routing_truth;
