// rmos-ingress/src/pipeline.rs
// ============================================================================
// Module: OPERATION-Lane Pipeline Routes
// Description: One generic set of handlers mounted under every tool lane.
// Purpose: Avoid duplicating the SPEC/PLAN/DECISION/EXECUTION/JOB_LOG wiring
//          per tool kind; each lane differs only in its URL prefix and the
//          `tool_kind` stamped on its SPEC.
// Dependencies: axum, rmos-core, serde, serde_json, uuid
// ============================================================================

//! ## Overview
//! Every pipeline lane shares the same five-stage shape. Handlers here are
//! thin: deserialize the body, call the orchestrator, wrap the result in the
//! response envelope. No handler performs geometric or physical computation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use rmos_contract::routing::Lane;
use rmos_contract::routing::RouteSpec;
use rmos_core::ArtifactId;
use rmos_core::BatchLabel;
use rmos_core::DesignItem;
use rmos_core::FeasibilityVerdict;
use rmos_core::JobMetrics;
use rmos_core::LearningDecisionOutcome;
use rmos_core::MachiningContext;
use rmos_core::PrincipalId;
use rmos_core::RequestId;
use rmos_core::SessionId;
use rmos_core::ToolKind;
use serde::Deserialize;
use serde::Serialize;

use crate::error::IngressError;
use crate::state::AppState;

// ============================================================================
// SECTION: Lane Table
// ============================================================================

/// Every pipeline lane's tool kind and URL prefix.
pub const PIPELINE_LANES: &[(&str, &str)] = &[
    ("saw_batch", "/api/saw/batch"),
    ("rosette", "/api/rosette"),
    ("rmos_toolpaths", "/api/rmos-toolpaths"),
    ("vcarve", "/api/vcarve"),
    ("roughing", "/api/roughing"),
    ("drilling", "/api/drilling"),
    ("biarc", "/api/biarc"),
    ("relief", "/api/relief"),
    ("adaptive_pocket", "/api/adaptive-pocket"),
    ("helical", "/api/helical"),
];

const OPERATIONS: &[&str] = &[
    "spec",
    "plan",
    "approve",
    "reject",
    "execute",
    "toolpaths",
    "job-log",
    "retry-execution",
    "learning-decision",
];

/// Returns the declared [`RouteSpec`]s for every lane, for route-registry
/// and routing-truth introspection.
#[must_use]
pub fn routes() -> Vec<RouteSpec> {
    PIPELINE_LANES
        .iter()
        .flat_map(|(tool, prefix)| {
            OPERATIONS.iter().map(move |operation| {
                RouteSpec::new(format!("{prefix}/{operation}"), ["POST"], format!("{tool}_{operation}"), Lane::Operation)
            })
        })
        .collect()
}

/// Mounts every lane's routes onto a fresh router, nested under its prefix.
#[must_use]
pub fn router() -> Router<AppState> {
    PIPELINE_LANES.iter().fold(Router::new(), |router, &(tool, prefix)| router.nest(prefix, lane_router(ToolKind::new(tool))))
}

fn lane_router(tool_kind: ToolKind) -> Router<AppState> {
    Router::new()
        .route(
            "/spec",
            post(move |state: State<AppState>, body: Json<CreateSpecBody>| create_spec(tool_kind.clone(), state, body)),
        )
        .route("/plan", post(create_plan))
        .route("/approve", post(approve))
        .route("/reject", post(reject))
        .route("/execute", post(execute))
        .route("/toolpaths", post(execute))
        .route("/job-log", post(write_job_log))
        .route("/retry-execution", post(retry_execution))
        .route("/learning-decision", post(record_learning_decision))
}

fn new_request_id() -> RequestId {
    RequestId::new(uuid::Uuid::new_v4().to_string())
}

// ============================================================================
// SECTION: Request / Response Bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateSpecBody {
    session_id: SessionId,
    batch_label: BatchLabel,
    items: Vec<DesignItem>,
    op_type: String,
    blade_id: Option<String>,
    machine_profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePlanBody {
    spec_id: ArtifactId,
    context: MachiningContext,
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    plan_id: ArtifactId,
    spec_id: ArtifactId,
    approved_by: PrincipalId,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteBody {
    decision_id: ArtifactId,
    context: MachiningContext,
}

#[derive(Debug, Deserialize)]
struct RetryExecutionBody {
    execution_id: ArtifactId,
    context: MachiningContext,
}

#[derive(Debug, Deserialize)]
struct JobLogBody {
    execution_id: ArtifactId,
    decision_id: ArtifactId,
    metrics: JobMetrics,
}

#[derive(Debug, Deserialize)]
struct LearningDecisionBody {
    learning_event_id: ArtifactId,
    decided_by: PrincipalId,
    outcome: LearningDecisionOutcome,
    reason: Option<String>,
}

/// Envelope every OPERATION response carries: a stable request identifier
/// plus the identifier of the artifact the write produced, if any.
#[derive(Debug, Serialize)]
struct OperationResponse {
    request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact_id: Option<ArtifactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<FeasibilityVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_sha256: Option<Vec<String>>,
}

impl OperationResponse {
    fn for_artifact(request_id: RequestId, artifact_id: ArtifactId) -> Self {
        Self { request_id, artifact_id: Some(artifact_id), verdict: None, attachment_sha256: None }
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

async fn create_spec(
    tool_kind: ToolKind,
    State(state): State<AppState>,
    Json(body): Json<CreateSpecBody>,
) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let spec_id = state.orchestrator.create_spec(rmos_core::CreateSpecRequest {
        session_id: body.session_id,
        batch_label: body.batch_label,
        tool_kind,
        items: body.items,
        op_type: body.op_type,
        blade_id: body.blade_id,
        machine_profile: body.machine_profile,
    })?;
    Ok(Json(OperationResponse::for_artifact(request_id, spec_id)))
}

async fn create_plan(State(state): State<AppState>, Json(body): Json<CreatePlanBody>) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let result = state.orchestrator.create_plan(rmos_core::CreatePlanRequest { spec_id: body.spec_id, context: body.context })?;
    Ok(Json(OperationResponse {
        request_id,
        artifact_id: Some(result.plan_id),
        verdict: Some(result.verdict),
        attachment_sha256: None,
    }))
}

async fn approve(State(state): State<AppState>, Json(body): Json<DecisionBody>) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let decision_id = state.orchestrator.approve(&body.plan_id, &body.spec_id, body.approved_by, &body.reason)?;
    Ok(Json(OperationResponse::for_artifact(request_id, decision_id)))
}

async fn reject(State(state): State<AppState>, Json(body): Json<DecisionBody>) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let decision_id = state.orchestrator.reject(&body.plan_id, &body.spec_id, body.approved_by, &body.reason)?;
    Ok(Json(OperationResponse::for_artifact(request_id, decision_id)))
}

async fn execute(State(state): State<AppState>, Json(body): Json<ExecuteBody>) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let result = state.orchestrator.execute(&body.decision_id, &body.context)?;
    Ok(Json(OperationResponse {
        request_id,
        artifact_id: Some(result.execution_id),
        verdict: None,
        attachment_sha256: Some(result.attachment_sha256),
    }))
}

async fn retry_execution(
    State(state): State<AppState>,
    Json(body): Json<RetryExecutionBody>,
) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let result = state.orchestrator.retry_execution(&body.execution_id, &body.context)?;
    Ok(Json(OperationResponse {
        request_id,
        artifact_id: Some(result.execution_id),
        verdict: None,
        attachment_sha256: Some(result.attachment_sha256),
    }))
}

async fn write_job_log(State(state): State<AppState>, Json(body): Json<JobLogBody>) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let job_log_id = state.orchestrator.write_job_log(&body.execution_id, &body.decision_id, body.metrics)?;
    Ok(Json(OperationResponse::for_artifact(request_id, job_log_id)))
}

async fn record_learning_decision(
    State(state): State<AppState>,
    Json(body): Json<LearningDecisionBody>,
) -> Result<Json<OperationResponse>, IngressError> {
    let request_id = new_request_id();
    let decision_id =
        state.orchestrator.record_learning_decision(&body.learning_event_id, body.decided_by, body.outcome, body.reason)?;
    Ok(Json(OperationResponse::for_artifact(request_id, decision_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_lane_declares_the_full_operation_set() {
        let declared = routes();
        assert_eq!(declared.len(), PIPELINE_LANES.len() * OPERATIONS.len());
        assert!(declared.iter().all(|route| route.lane == Lane::Operation));
    }

    #[test]
    fn lane_paths_are_unique() {
        let declared = routes();
        let mut paths: Vec<&str> = declared.iter().map(|route| route.path.as_str()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), declared.len());
    }
}
