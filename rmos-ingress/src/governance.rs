// rmos-ingress/src/governance.rs
// ============================================================================
// Module: Governance Introspection & Deprecation Middleware
// Description: Routing-truth endpoint, health check, and the deprecation
//              header middleware every request passes through.
// Purpose: Give operators a runtime view of mounted routes that can never
//          drift from what's actually served, and enforce the deprecation
//          contract uniformly regardless of which lane a route belongs to.
// Dependencies: axum, rmos-contract, rmos-core, rmos-store-sqlite, serde
// ============================================================================

//! ## Overview
//! The deprecation middleware consults the same [`rmos_contract::routing::RouteRegistry`]
//! the routing-truth endpoint reads, so the two can never disagree about
//! which routes are deprecated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::Router;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::get;
use rmos_contract::routing::Lane;
use rmos_contract::routing::RouteSpec;
use rmos_contract::routing::RoutingTruth;
use rmos_store_sqlite::SqliteStore;
use serde::Serialize;

use crate::audit::GovernanceAuditEvent;
use crate::state::AppState;

// ============================================================================
// SECTION: Route Registry
// ============================================================================

/// Returns the declared [`RouteSpec`]s for the governance surface.
#[must_use]
pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new("/api/_meta/routing-truth", ["GET"], "routing_truth", Lane::Meta),
        RouteSpec::new("/api/health", ["GET"], "health", Lane::Core),
    ]
}

/// Mounts the governance surface onto a fresh router.
#[must_use]
pub fn router() -> Router<AppState> {
    Router::new().route("/api/_meta/routing-truth", get(routing_truth)).route("/api/health", get(health))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

async fn routing_truth(State(state): State<AppState>) -> Json<RoutingTruth> {
    Json(state.routes.routing_truth())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store_schema_version: i64,
    engines_registered: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store_schema_version: SqliteStore::schema_version(),
        engines_registered: state.orchestrator.engine_count(),
    })
}

// ============================================================================
// SECTION: Deprecation Middleware
// ============================================================================

/// Attaches deprecation headers to any response whose request path matches a
/// declared deprecated prefix, and logs the hit at warning level.
pub async fn deprecation_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let headers = state.routes.deprecation_headers_for(&path);

    let mut response = next.run(request).await;

    if let Some(headers) = headers {
        state.audit.record(&GovernanceAuditEvent::new(
            headers.x_deprecated_lane.clone(),
            method,
            path,
            headers.link.clone(),
        ));

        let response_headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(headers.deprecation) {
            response_headers.insert("Deprecation", value);
        }
        if let Ok(value) = HeaderValue::from_str(&headers.sunset) {
            response_headers.insert("Sunset", value);
        }
        if let Ok(value) = HeaderValue::from_str(&headers.x_deprecated_lane) {
            response_headers.insert("X-Deprecated-Lane", value);
        }
        if let Ok(value) = HeaderValue::from_str(&headers.link) {
            response_headers.insert("Link", value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_routes_are_core_and_meta_lanes() {
        let declared = routes();
        assert_eq!(declared.len(), 2);
        assert!(declared.iter().any(|route| route.lane == Lane::Meta));
        assert!(declared.iter().any(|route| route.lane == Lane::Core));
    }
}
