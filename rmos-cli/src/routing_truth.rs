// rmos-cli/src/routing_truth.rs
// ============================================================================
// Module: Routing-Truth Check
// Description: Compares a checked-in routing-truth snapshot against the
//              routes a constructed application would actually serve.
// Purpose: Catch route drift (an added, removed, or re-lane'd route) at CI
//          time instead of at request time.
// Dependencies: rmos-contract, serde_json
// ============================================================================

//! ## Overview
//! [`check_routing_truth`] takes the live [`rmos_contract::routing::RoutingTruth`]
//! a router reports and the path to a checked-in JSON snapshot, and fails
//! loudly on any mismatch rather than silently drifting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use rmos_contract::routing::RoutingTruth;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while checking a routing-truth snapshot.
#[derive(Debug, Error)]
pub enum RoutingTruthCheckError {
    /// The snapshot file could not be read.
    #[error("failed to read routing-truth snapshot at {path}: {source}")]
    Read {
        /// Path to the snapshot file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not valid JSON, or doesn't match the expected
    /// shape.
    #[error("failed to parse routing-truth snapshot at {path}: {source}")]
    Parse {
        /// Path to the snapshot file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A route recorded in the snapshot is no longer served live. This is
    /// the only drift that fails the gate; a route present live but absent
    /// from the snapshot is reported as a warning instead.
    #[error("routing truth drift detected: snapshot route(s) missing from the live router: {}", routes.join(", "))]
    MissingRoutes {
        /// `path` of each snapshot route not found live, keyed by `(path,
        /// methods)`.
        routes: Vec<String>,
    },
}

// ============================================================================
// SECTION: Check
// ============================================================================

/// `(path, methods)` key used to match a snapshot route against a live one,
/// independent of declaration order.
fn route_key(route: &rmos_contract::routing::RouteSummary) -> (String, Vec<String>) {
    let mut methods = route.methods.clone();
    methods.sort();
    (route.path.clone(), methods)
}

/// Loads the routing-truth snapshot at `path` and compares it against
/// `live`, keyed by `(path, methods)`. A snapshot route missing from `live`
/// fails the gate; a live route absent from the snapshot is returned as a
/// non-fatal warning rather than a drift failure.
///
/// # Errors
///
/// Returns [`RoutingTruthCheckError`] if the snapshot cannot be read or
/// parsed, or if it has routes the live router no longer serves.
pub fn check_routing_truth(live: &RoutingTruth, path: &Path) -> Result<Vec<String>, RoutingTruthCheckError> {
    let bytes = fs::read(path).map_err(|source| RoutingTruthCheckError::Read { path: path.display().to_string(), source })?;
    let expected: RoutingTruth =
        serde_json::from_slice(&bytes).map_err(|source| RoutingTruthCheckError::Parse { path: path.display().to_string(), source })?;

    let live_keys: std::collections::BTreeSet<_> = live.routes.iter().map(route_key).collect();
    let missing: Vec<String> =
        expected.routes.iter().filter(|route| !live_keys.contains(&route_key(route))).map(|route| route.path.clone()).collect();
    if !missing.is_empty() {
        return Err(RoutingTruthCheckError::MissingRoutes { routes: missing });
    }

    let expected_keys: std::collections::BTreeSet<_> = expected.routes.iter().map(route_key).collect();
    let warnings = live
        .routes
        .iter()
        .filter(|route| !expected_keys.contains(&route_key(route)))
        .map(|route| format!("new route not present in snapshot: {} [{}]", route.path, route.methods.join(",")))
        .collect();
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use rmos_contract::routing::RouteSummary;

    use super::*;

    fn write_snapshot(dir: &tempfile::TempDir, truth: &RoutingTruth) -> std::path::PathBuf {
        let path = dir.path().join("routing-truth.json");
        fs::write(&path, serde_json::to_vec_pretty(truth).expect("serializable")).expect("write snapshot");
        path
    }

    #[test]
    fn identical_snapshot_passes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let truth = RoutingTruth {
            count: 1,
            deprecated_count: 0,
            routes: vec![RouteSummary {
                path: "/api/health".to_string(),
                methods: vec!["GET".to_string()],
                name: "health".to_string(),
                deprecated: false,
                deprecated_reason: None,
            }],
        };
        let path = write_snapshot(&dir, &truth);
        let warnings = check_routing_truth(&truth, &path).expect("must match");
        assert!(warnings.is_empty());
    }

    #[test]
    fn a_route_missing_from_live_fails_the_gate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = RoutingTruth {
            count: 1,
            deprecated_count: 0,
            routes: vec![RouteSummary {
                path: "/api/health".to_string(),
                methods: vec!["GET".to_string()],
                name: "health".to_string(),
                deprecated: false,
                deprecated_reason: None,
            }],
        };
        let path = write_snapshot(&dir, &snapshot);
        let live = RoutingTruth { count: 0, deprecated_count: 0, routes: vec![] };
        let error = check_routing_truth(&live, &path).expect_err("must detect a missing route");
        assert!(matches!(error, RoutingTruthCheckError::MissingRoutes { routes } if routes == vec!["/api/health".to_string()]));
    }

    #[test]
    fn a_new_route_not_in_the_snapshot_is_a_warning_not_a_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = RoutingTruth { count: 0, deprecated_count: 0, routes: vec![] };
        let path = write_snapshot(&dir, &snapshot);
        let live = RoutingTruth {
            count: 1,
            deprecated_count: 0,
            routes: vec![RouteSummary {
                path: "/api/health".to_string(),
                methods: vec!["GET".to_string()],
                name: "health".to_string(),
                deprecated: false,
                deprecated_reason: None,
            }],
        };
        let warnings = check_routing_truth(&live, &path).expect("new routes must not fail the gate");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("/api/health"));
    }

    #[test]
    fn methods_order_does_not_trigger_false_drift() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = RoutingTruth {
            count: 1,
            deprecated_count: 0,
            routes: vec![RouteSummary {
                path: "/api/health".to_string(),
                methods: vec!["POST".to_string(), "GET".to_string()],
                name: "health".to_string(),
                deprecated: false,
                deprecated_reason: None,
            }],
        };
        let path = write_snapshot(&dir, &snapshot);
        let live = RoutingTruth {
            count: 1,
            deprecated_count: 0,
            routes: vec![RouteSummary {
                path: "/api/health".to_string(),
                methods: vec!["GET".to_string(), "POST".to_string()],
                name: "health".to_string(),
                deprecated: false,
                deprecated_reason: None,
            }],
        };
        let warnings = check_routing_truth(&live, &path).expect("method order must not matter");
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let live = RoutingTruth { count: 0, deprecated_count: 0, routes: vec![] };
        let error = check_routing_truth(&live, Path::new("/nonexistent/routing-truth.json")).expect_err("must error");
        assert!(matches!(error, RoutingTruthCheckError::Read { .. }));
    }
}
