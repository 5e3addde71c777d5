// rmos-ingress/src/runs.rs
// ============================================================================
// Module: Run / Attachment Read Surface
// Description: Read-only Run introspection plus the advisory attach path.
// Purpose: Let operators and advisory producers inspect Run history and
//          attach non-authoritative payloads without touching the
//          orchestrator's write path directly.
// Dependencies: axum, rmos-broker, rmos-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every handler here is read-only against the artifact and blob stores,
//! except [`suggest_and_attach`], which writes to the advisory registry —
//! never to the artifact store. Advisory producers cannot reach the
//! orchestrator through this surface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use rmos_contract::routing::Lane;
use rmos_contract::routing::RouteSpec;
use rmos_core::AdvisoryInputReference;
use rmos_core::AdvisoryStatus;
use rmos_core::ArtifactId;
use rmos_core::ArtifactQuery;
use rmos_core::ArtifactStore;
use rmos_core::AttachmentKind;
use rmos_core::BatchLabel;
use rmos_core::BlobStore;
use rmos_core::ContentRef;
use rmos_core::RequestId;
use rmos_core::Sha256Hex;
use rmos_core::Stage;
use rmos_core::core::time::to_rfc3339;
use serde::Deserialize;
use serde::Serialize;

use crate::error::IngressError;
use crate::state::AppState;

// ============================================================================
// SECTION: Route Registry
// ============================================================================

/// Returns the declared [`RouteSpec`]s for the Run/attachment surface.
#[must_use]
pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new("/api/rmos/runs", ["GET"], "list_runs", Lane::Rmos),
        RouteSpec::new("/api/rmos/runs/{id}", ["GET"], "get_run", Lane::Rmos),
        RouteSpec::new("/api/rmos/runs/{id}/attachments", ["GET"], "list_attachments", Lane::Rmos),
        RouteSpec::new("/api/rmos/runs/{id}/attachments/verify", ["GET"], "verify_attachments", Lane::Rmos),
        RouteSpec::new("/api/rmos/runs/{id}/advisories", ["GET"], "list_advisories", Lane::Rmos),
        RouteSpec::new("/api/rmos/runs/{id}/suggest-and-attach", ["POST"], "suggest_and_attach", Lane::Rmos),
        RouteSpec::new("/api/rmos/acoustics/attachments/{sha256}", ["GET"], "download_attachment", Lane::Rmos),
        RouteSpec::new("/api/rmos/acoustics/index/attachment_meta", ["GET"], "attachment_meta_index", Lane::Rmos),
        RouteSpec::new("/api/rmos/acoustics/index/rebuild_attachment_meta", ["POST"], "rebuild_attachment_meta", Lane::Rmos),
    ]
}

/// Mounts the Run/attachment surface onto a fresh router.
#[must_use]
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/rmos/runs", get(list_runs))
        .route("/api/rmos/runs/{id}", get(get_run))
        .route("/api/rmos/runs/{id}/attachments", get(list_attachments))
        .route("/api/rmos/runs/{id}/attachments/verify", get(verify_attachments))
        .route("/api/rmos/runs/{id}/advisories", get(list_attachments))
        .route("/api/rmos/runs/{id}/suggest-and-attach", post(suggest_and_attach))
        .route("/api/rmos/acoustics/attachments/{sha256}", get(download_attachment))
        .route("/api/rmos/acoustics/index/attachment_meta", get(attachment_meta_index))
        .route("/api/rmos/acoustics/index/rebuild_attachment_meta", post(rebuild_attachment_meta))
}

// ============================================================================
// SECTION: List / Get Runs
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListRunsQuery {
    limit: Option<usize>,
    session_id: Option<String>,
    batch_label: Option<String>,
}

async fn list_runs(State(state): State<AppState>, Query(query): Query<ListRunsQuery>) -> Result<Json<Vec<rmos_core::Artifact>>, IngressError> {
    let artifact_query = ArtifactQuery {
        stage: Some(Stage::Spec),
        session_id: query.session_id.map(rmos_core::SessionId::new),
        batch_label: query.batch_label.map(BatchLabel::new),
        ..ArtifactQuery::default()
    };
    let mut runs = state.orchestrator.store().query_artifacts(&artifact_query)?;
    if let Some(limit) = query.limit {
        runs.truncate(limit);
    }
    Ok(Json(runs))
}

async fn get_run(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<rmos_core::Artifact>, IngressError> {
    let artifact = state.orchestrator.store().get_artifact(&ArtifactId::new(id))?;
    Ok(Json(artifact))
}

// ============================================================================
// SECTION: Advisory Attachments
// ============================================================================

async fn list_attachments(State(state): State<AppState>, Path(id): Path<String>) -> Json<Vec<AdvisoryInputReference>> {
    Json(state.advisories.list(&ArtifactId::new(id)))
}

#[derive(Debug, Serialize)]
struct VerifyAttachmentsResponse {
    missing_sha256: Vec<Sha256Hex>,
}

async fn verify_attachments(State(state): State<AppState>, Path(id): Path<String>) -> Json<VerifyAttachmentsResponse> {
    let references = state.advisories.list(&ArtifactId::new(id));
    let missing = references
        .into_iter()
        .filter(|reference| state.orchestrator.blobs().get_blob(&reference.sha256).is_err())
        .map(|reference| reference.sha256)
        .collect();
    Json(VerifyAttachmentsResponse { missing_sha256: missing })
}

#[derive(Debug, Deserialize)]
struct SuggestAndAttachBody {
    producer_id: String,
    content_ref: ContentRef,
    kind: AttachmentKind,
    filename: Option<String>,
}

#[derive(Debug, Serialize)]
struct SuggestAndAttachResponse {
    request_id: RequestId,
    sha256: Sha256Hex,
    attachment_url: String,
}

async fn suggest_and_attach(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SuggestAndAttachBody>,
) -> Result<Json<SuggestAndAttachResponse>, IngressError> {
    let run_id = ArtifactId::new(id);
    let request_id = RequestId::new(uuid::Uuid::new_v4().to_string());
    let sha256 =
        state.resolver.resolve_and_store(&body.content_ref, body.kind, body.filename.as_deref(), state.orchestrator.blobs())?;
    let created_at_utc = to_rfc3339(state.clock.now_utc()).map_err(|err| IngressError::Validation(err.to_string()))?;
    state.advisories.append(
        run_id,
        AdvisoryInputReference {
            sha256: sha256.clone(),
            kind: body.kind,
            producer_id: body.producer_id,
            request_id: request_id.clone(),
            created_at_utc,
            status: AdvisoryStatus::Ready,
        },
    );
    Ok(Json(SuggestAndAttachResponse {
        request_id,
        sha256: sha256.clone(),
        attachment_url: format!("/api/rmos/acoustics/attachments/{sha256}"),
    }))
}

// ============================================================================
// SECTION: Blob Download & Meta-Index
// ============================================================================

async fn download_attachment(State(state): State<AppState>, Path(sha256): Path<String>) -> Result<Response, IngressError> {
    let bytes = state.orchestrator.blobs().get_blob(&Sha256Hex::new(sha256))?;
    Ok(([(CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

#[derive(Debug, Deserialize)]
struct AttachmentMetaQuery {
    kind: Option<AttachmentKind>,
    mime_prefix: Option<String>,
    cursor: Option<String>,
    limit: Option<usize>,
}

async fn attachment_meta_index(
    State(state): State<AppState>,
    Query(query): Query<AttachmentMetaQuery>,
) -> Result<Json<rmos_core::MetaIndexPage>, IngressError> {
    let limit = query.limit.unwrap_or(100);
    let page = state.orchestrator.blobs().meta_index_query(query.kind, query.mime_prefix.as_deref(), query.cursor.as_deref(), limit)?;
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
struct RebuildAttachmentMetaResponse {
    runs_scanned: usize,
    attachments_indexed: usize,
    unique_sha256: usize,
}

/// Reconstructs attachment coverage by walking the artifacts themselves
/// rather than the meta-index: every SPEC artifact counts as a scanned Run,
/// and every `attachments` reference recorded on an EXECUTION artifact's
/// payload is counted and deduplicated by SHA-256. This is the sweep the
/// meta-index is checked against, so it stays idempotent across repeated
/// calls regardless of how many times a given attachment was produced.
async fn rebuild_attachment_meta(State(state): State<AppState>) -> Result<Json<RebuildAttachmentMetaResponse>, IngressError> {
    let store = state.orchestrator.store();
    let runs = store.query_artifacts(&ArtifactQuery { stage: Some(Stage::Spec), ..ArtifactQuery::default() })?;
    let executions = store.query_artifacts(&ArtifactQuery { stage: Some(Stage::Execution), ..ArtifactQuery::default() })?;

    let mut attachments_indexed = 0usize;
    let mut unique_sha256 = std::collections::BTreeSet::new();
    for execution in &executions {
        let Some(shas) = execution.payload.get("attachments").and_then(serde_json::Value::as_array) else {
            continue;
        };
        for sha in shas.iter().filter_map(serde_json::Value::as_str) {
            attachments_indexed += 1;
            unique_sha256.insert(sha.to_string());
        }
    }

    Ok(Json(RebuildAttachmentMetaResponse {
        runs_scanned: runs.len(),
        attachments_indexed,
        unique_sha256: unique_sha256.len(),
    }))
}
