// rmos-ingress/src/state.rs
// ============================================================================
// Module: Ingress Application State
// Description: Shared, cloneable state every route handler closes over.
// Purpose: Wire the orchestrator, route registry, audit sink, and advisory
//          registry together once at startup.
// Dependencies: axum, rmos-broker, rmos-config, rmos-contract, rmos-core,
//               rmos-providers, rmos-store-sqlite
// ============================================================================

//! ## Overview
//! [`AppState`] is the single `axum` extractor every handler in this crate
//! takes. It is built once in [`crate::server::build_router`] and cloned
//! cheaply per request via internal `Arc`s.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rmos_broker::AttachmentResolver;
use rmos_config::RmosConfig;
use rmos_contract::routing::RouteRegistry;
use rmos_core::Clock;
use rmos_core::FeasibilityEngine;
use rmos_core::Orchestrator;
use rmos_core::SystemClock;
use rmos_core::ToolKind;
use rmos_providers::EngineAccessPolicy;
use rmos_providers::ReferenceToolpathEngine;
use rmos_store_sqlite::SqliteStore;
use rmos_store_sqlite::SqliteStoreError;

use crate::advisory::AdvisoryRegistry;
use crate::audit::GovernanceAuditSink;
use crate::audit::StderrGovernanceAuditSink;

/// Tool kind lanes this deployment exercises with the deterministic
/// reference engine, pending a concrete post-processor per lane.
const KNOWN_TOOL_KINDS: &[&str] = &[
    "saw_batch",
    "rosette",
    "rmos_toolpaths",
    "vcarve",
    "roughing",
    "drilling",
    "biarc",
    "relief",
    "adaptive_pocket",
    "helical",
];

// ============================================================================
// SECTION: App State
// ============================================================================

/// Shared ingress state.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline orchestrator, backed by the configured `SQLite` store.
    pub orchestrator: Arc<Orchestrator<SqliteStore, SqliteStore>>,
    /// Explicit route registry for the governance middleware and the
    /// routing-truth endpoint.
    pub routes: Arc<RouteRegistry>,
    /// Warning-level audit sink for deprecated-route hits.
    pub audit: Arc<dyn GovernanceAuditSink>,
    /// In-memory advisory attachment index.
    pub advisories: Arc<AdvisoryRegistry>,
    /// Resolver for caller-supplied advisory content references.
    pub resolver: Arc<AttachmentResolver>,
    /// Clock used to stamp advisory references, shared with the
    /// orchestrator's own clock.
    pub clock: Arc<dyn Clock>,
    /// Accepted bearer tokens for the ingress API. Empty disables auth.
    pub bearer_tokens: Vec<String>,
}

/// Errors raised while assembling [`AppState`] at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The configured `SQLite` store could not be opened.
    #[error(transparent)]
    Store(#[from] SqliteStoreError),
}

impl AppState {
    /// Builds application state from validated configuration.
    ///
    /// Registers the deterministic reference engine for every tool kind
    /// permitted by `config`'s engine access policy, and wires an
    /// `AttachmentResolver` with the `inline` and `file` content sources.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the configured store cannot be opened.
    pub fn build(config: &RmosConfig) -> Result<Self, StateError> {
        let store = SqliteStore::new(&config.run_state_store.sqlite)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mut orchestrator = Orchestrator::new(
            store.clone(),
            store,
            clock,
            FeasibilityEngine::new("1.0.0"),
            config.feedback_flags(),
        );

        register_reference_engines(&mut orchestrator, config.engine_access_policy());

        let resolver = AttachmentResolver::builder()
            .source("inline", rmos_broker::InlineSource::new())
            .source("file", rmos_broker::FileSource::unrestricted())
            .build();

        let mut routes = RouteRegistry::new(config.deprecation_table());
        routes.register_all(crate::pipeline::routes());
        routes.register_all(crate::runs::routes());
        routes.register_all(crate::governance::routes());

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            routes: Arc::new(routes),
            audit: Arc::new(StderrGovernanceAuditSink),
            advisories: Arc::new(AdvisoryRegistry::new()),
            resolver: Arc::new(resolver),
            clock: Arc::new(SystemClock),
            bearer_tokens: config.server.bearer_tokens.clone(),
        })
    }
}

/// Registers the deterministic reference engine for every known tool kind
/// the given policy permits, skipping the rest rather than failing startup.
fn register_reference_engines(orchestrator: &mut Orchestrator<SqliteStore, SqliteStore>, policy: EngineAccessPolicy) {
    for kind in KNOWN_TOOL_KINDS {
        let tool_kind = ToolKind::new(*kind);
        if !policy.is_allowed(&tool_kind) {
            continue;
        }
        let engine = ReferenceToolpathEngine::new(tool_kind, "reference-1");
        orchestrator.register_engine(Arc::new(engine));
    }
}
