// rmos-contract/src/routing.rs
// ============================================================================
// Module: RMOS Route Registry
// Description: Lane classification, deprecation table, and routing truth.
// Purpose: Give the ingress server one explicit registry to mount routes
//          from and to answer routing-truth queries against.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each component that mounts HTTP routes builds its [`RouteSpec`]s and
//! hands them to a [`RouteRegistry`] at startup. The registry is consulted
//! twice per matching request against a deprecated prefix: once to mount
//! the handler, once by the governance middleware to attach deprecation
//! headers. The routing-truth endpoint reads the same registry directly, so
//! it can never drift from what's actually mounted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Lane
// ============================================================================

/// Governance classification of a mounted route.
///
/// `Operation` routes must invoke the pipeline orchestrator; every other
/// lane may not write artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lane {
    /// Core infrastructure routes (health, version).
    Core,
    /// Introspection and governance meta-routes.
    Meta,
    /// Writes artifacts through the pipeline orchestrator.
    Operation,
    /// Run / attachment read surface.
    Rmos,
    /// CAM-adjacent preview surface.
    Cam,
    /// Developer/tooling utility routes.
    Tooling,
    /// Art-studio preview surface.
    Art,
    /// Comparison/diff utility routes.
    Compare,
    /// Simulation preview routes.
    Simulation,
    /// Deprecated legacy surface, kept for migration.
    Legacy,
    /// Stateless utility routes with no governance significance.
    Utility,
}

impl Lane {
    /// Returns `true` if routes in this lane are permitted to write
    /// artifacts through the orchestrator.
    #[must_use]
    pub const fn writes_artifacts(self) -> bool {
        matches!(self, Self::Operation)
    }

    /// Returns the lane's lowercase key, used in deprecation headers and
    /// routing-truth output.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Meta => "meta",
            Self::Operation => "operation",
            Self::Rmos => "rmos",
            Self::Cam => "cam",
            Self::Tooling => "tooling",
            Self::Art => "art",
            Self::Compare => "compare",
            Self::Simulation => "simulation",
            Self::Legacy => "legacy",
            Self::Utility => "utility",
        }
    }
}

// ============================================================================
// SECTION: Route Spec
// ============================================================================

/// A single route as mounted by the ingress server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Mount path, e.g. `/api/saw/batch/spec`.
    pub path: String,
    /// HTTP methods this route answers, e.g. `["POST"]`.
    pub methods: Vec<String>,
    /// Stable, human-readable route name for diagnostics.
    pub name: String,
    /// Governance lane this route belongs to.
    pub lane: Lane,
}

impl RouteSpec {
    /// Builds a new route spec with methods sorted for stable diffs.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        methods: impl IntoIterator<Item = &'static str>,
        name: impl Into<String>,
        lane: Lane,
    ) -> Self {
        let mut methods: Vec<String> = methods.into_iter().map(ToString::to_string).collect();
        methods.sort();
        Self {
            path: path.into(),
            methods,
            name: name.into(),
            lane,
        }
    }
}

// ============================================================================
// SECTION: Deprecation
// ============================================================================

/// A declared deprecated lane prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    /// Path prefix this entry governs, e.g. `/api/art-studio`.
    pub prefix: String,
    /// Lane key surfaced in `X-Deprecated-Lane`.
    pub lane_key: String,
    /// Prefix clients should migrate to.
    pub successor_prefix: String,
    /// ISO sunset date.
    pub sunset_date: String,
}

/// Response headers a deprecated request must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationHeaders {
    /// `Deprecation` header value, always `"true"` when present.
    pub deprecation: &'static str,
    /// `Sunset` header value.
    pub sunset: String,
    /// `X-Deprecated-Lane` header value.
    pub x_deprecated_lane: String,
    /// `Link` header value.
    pub link: String,
}

impl DeprecationEntry {
    /// Builds the response headers this entry requires.
    #[must_use]
    pub fn headers(&self) -> DeprecationHeaders {
        DeprecationHeaders {
            deprecation: "true",
            sunset: self.sunset_date.clone(),
            x_deprecated_lane: self.lane_key.clone(),
            link: format!("<{}>; rel=\"successor-version\"", self.successor_prefix),
        }
    }
}

/// Table of declared deprecated prefixes, matched longest-prefix-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationTable {
    /// Declared entries; order is insignificant, matching is by prefix
    /// length.
    entries: Vec<DeprecationEntry>,
}

impl DeprecationTable {
    /// Creates an empty deprecation table.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Declares a deprecated prefix, returning `self` for chaining.
    #[must_use]
    pub fn with_entry(mut self, entry: DeprecationEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Finds the longest matching prefix entry for `path`, if any.
    #[must_use]
    pub fn match_for(&self, path: &str) -> Option<&DeprecationEntry> {
        self.entries
            .iter()
            .filter(|entry| path.starts_with(entry.prefix.as_str()))
            .max_by_key(|entry| entry.prefix.len())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// One entry in the sorted routing-truth response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Mount path.
    pub path: String,
    /// HTTP methods, sorted.
    pub methods: Vec<String>,
    /// Stable route name.
    pub name: String,
    /// `true` if a declared deprecation prefix matches this route's path.
    pub deprecated: bool,
    /// Human-readable deprecation explanation, if deprecated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_reason: Option<String>,
}

/// Full routing-truth introspection response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTruth {
    /// Total mounted routes.
    pub count: usize,
    /// Routes matching a declared deprecation prefix.
    pub deprecated_count: usize,
    /// Routes sorted by `(path, methods)`.
    pub routes: Vec<RouteSummary>,
}

/// Explicit registry of mounted routes, composed at server startup.
///
/// Replaces dynamic router aggregation: every component exposes a
/// `routes()` function returning its [`RouteSpec`]s, and the server
/// registers them here once before binding.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    /// Mounted routes, in registration order.
    routes: Vec<RouteSpec>,
    /// Declared deprecated prefixes.
    deprecations: DeprecationTable,
}

impl RouteRegistry {
    /// Creates an empty registry with the given deprecation table.
    #[must_use]
    pub fn new(deprecations: DeprecationTable) -> Self {
        Self {
            routes: Vec::new(),
            deprecations,
        }
    }

    /// Registers a route.
    pub fn register(&mut self, route: RouteSpec) {
        self.routes.push(route);
    }

    /// Registers every route from `routes`, in order.
    pub fn register_all(&mut self, routes: impl IntoIterator<Item = RouteSpec>) {
        self.routes.extend(routes);
    }

    /// Returns the deprecation headers for `path`, if a declared prefix
    /// matches.
    #[must_use]
    pub fn deprecation_headers_for(&self, path: &str) -> Option<DeprecationHeaders> {
        self.deprecations.match_for(path).map(DeprecationEntry::headers)
    }

    /// Builds the routing-truth snapshot, sorted by `(path, methods)` for
    /// stable diffs across environments.
    #[must_use]
    pub fn routing_truth(&self) -> RoutingTruth {
        let mut summaries: Vec<RouteSummary> = self
            .routes
            .iter()
            .map(|route| {
                let matched = self.deprecations.match_for(&route.path);
                RouteSummary {
                    path: route.path.clone(),
                    methods: route.methods.clone(),
                    name: route.name.clone(),
                    deprecated: matched.is_some(),
                    deprecated_reason: matched.map(|entry| {
                        format!(
                            "deprecated lane `{}`, migrate to `{}` by {}",
                            entry.lane_key, entry.successor_prefix, entry.sunset_date
                        )
                    }),
                }
            })
            .collect();
        summaries.sort_by(|lhs, rhs| (&lhs.path, &lhs.methods).cmp(&(&rhs.path, &rhs.methods)));
        let deprecated_count = summaries.iter().filter(|route| route.deprecated).count();
        RoutingTruth {
            count: summaries.len(),
            deprecated_count,
            routes: summaries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RouteRegistry {
        let deprecations = DeprecationTable::new().with_entry(DeprecationEntry {
            prefix: "/api/art-studio".to_string(),
            lane_key: "legacy_art_studio_lane".to_string(),
            successor_prefix: "/api/art".to_string(),
            sunset_date: "2026-12-31".to_string(),
        });
        let mut registry = RouteRegistry::new(deprecations);
        registry.register_all([
            RouteSpec::new("/api/saw/batch/spec", ["POST"], "saw_batch.spec", Lane::Operation),
            RouteSpec::new("/api/art-studio/rosette/preview", ["GET"], "art_studio.rosette.preview", Lane::Legacy),
            RouteSpec::new("/api/_meta/routing-truth", ["GET"], "meta.routing_truth", Lane::Meta),
        ]);
        registry
    }

    #[test]
    fn routing_truth_is_sorted_by_path_then_methods() {
        let truth = registry().routing_truth();
        assert_eq!(truth.count, 3);
        let paths: Vec<&str> = truth.routes.iter().map(|route| route.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort_unstable();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn deprecated_prefix_match_carries_all_four_headers() {
        let registry = registry();
        let headers = registry
            .deprecation_headers_for("/api/art-studio/rosette/preview")
            .expect("deprecated match");
        assert_eq!(headers.deprecation, "true");
        assert_eq!(headers.sunset, "2026-12-31");
        assert_eq!(headers.x_deprecated_lane, "legacy_art_studio_lane");
        assert_eq!(headers.link, "</api/art>; rel=\"successor-version\"");
    }

    #[test]
    fn non_matching_prefix_carries_no_headers() {
        let registry = registry();
        assert!(registry.deprecation_headers_for("/api/saw/batch/spec").is_none());
    }

    #[test]
    fn routing_truth_counts_deprecated_routes() {
        let truth = registry().routing_truth();
        assert_eq!(truth.deprecated_count, 1);
    }

    #[test]
    fn operation_lane_is_the_only_writer() {
        assert!(Lane::Operation.writes_artifacts());
        assert!(!Lane::Utility.writes_artifacts());
        assert!(!Lane::Legacy.writes_artifacts());
    }
}
