// rmos-contract/src/lib.rs
// ============================================================================
// Module: RMOS Contract
// Description: Route registry, lane vocabulary, and deprecation table.
// Purpose: Back the `/api/_meta/routing-truth` endpoint with an explicit,
//          in-process registry rather than dynamic router aggregation.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every mounted HTTP route is declared once, statically, as a
//! [`routing::RouteSpec`] and registered into a [`routing::RouteRegistry`] at
//! server start. The registry is the single source of truth both for
//! dispatch and for the routing-truth introspection endpoint — there is no
//! separate "truth table" to drift out of sync with what's actually mounted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod routing;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use routing::DeprecationEntry;
pub use routing::DeprecationHeaders;
pub use routing::DeprecationTable;
pub use routing::Lane;
pub use routing::RouteRegistry;
pub use routing::RouteSpec;
pub use routing::RouteSummary;
pub use routing::RoutingTruth;
