// system-tests/src/lib.rs
// ============================================================================
// Module: System Tests
// Description: Placeholder library target; all test content lives under
//              `tests/` as integration tests.
// Purpose: Give Cargo a buildable target so `tests/` can depend on
//          dev-dependencies without a publishable library surface.
// Dependencies: none
// ============================================================================

//! Placeholder library target; all test content lives under `tests/` as
//! integration tests.
