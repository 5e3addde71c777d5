// rmos-ingress/src/error.rs
// ============================================================================
// Module: Ingress Error Taxonomy
// Description: Maps orchestrator, store, and resolver errors onto HTTP
//              status codes and the response envelope.
// Purpose: Give every handler one error type with one `IntoResponse` impl,
//          so no handler needs to hand-pick a status code.
// Dependencies: axum, rmos-core, rmos-broker, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Validation and invariant errors map to HTTP 4xx with no artifact written.
//! Feasibility blocks and drift detection map to 4xx as well, carrying
//! whatever artifact identifier triggered the block. Store/timeout failures
//! map to 5xx as retriable infrastructure faults. Engine failures never
//! reach this type: the orchestrator captures them into an EXECUTION
//! artifact with status `ERROR` and returns 2xx.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use rmos_broker::ResolverError;
use rmos_core::ArtifactStoreError;
use rmos_core::BlobStoreError;
use rmos_core::OrchestratorError;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Errors surfaced across the ingress HTTP boundary.
#[derive(Debug, Error)]
pub enum IngressError {
    /// Malformed request body or path parameter.
    #[error("validation error: {0}")]
    Validation(String),
    /// The orchestrator rejected the request.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    /// A direct artifact-store read (outside the orchestrator) failed.
    #[error(transparent)]
    Store(#[from] ArtifactStoreError),
    /// A direct blob-store read failed.
    #[error(transparent)]
    Blob(#[from] BlobStoreError),
    /// Advisory attachment resolution failed.
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    /// The requested route or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl IngressError {
    /// Maps this error to its HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Orchestrator(error) => orchestrator_status(error),
            Self::Store(error) => store_status(error),
            Self::Blob(_) | Self::Resolver(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Machine-readable error code surfaced in the response envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Orchestrator(error) => orchestrator_code(error),
            Self::Store(error) => store_code(error),
            Self::Blob(_) => "BLOB_ERROR",
            Self::Resolver(_) => "ATTACHMENT_RESOLUTION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

const fn orchestrator_status(error: &OrchestratorError) -> StatusCode {
    match error {
        OrchestratorError::Validation(_)
        | OrchestratorError::FeasibilityBlocked(_)
        | OrchestratorError::DriftDetected(_)
        | OrchestratorError::EngineNotRegistered(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::Store(error) => store_status(error),
        OrchestratorError::Blob(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::Feasibility(_) | OrchestratorError::Time(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn orchestrator_code(error: &OrchestratorError) -> &'static str {
    match error {
        OrchestratorError::Validation(_) => "VALIDATION_ERROR",
        OrchestratorError::Store(error) => store_code(error),
        OrchestratorError::Blob(_) => "BLOB_ERROR",
        OrchestratorError::FeasibilityBlocked(_) => "FEASIBILITY_BLOCKED",
        OrchestratorError::DriftDetected(_) => "DRIFT_DETECTED",
        OrchestratorError::Feasibility(_) => "FEASIBILITY_ENGINE_ERROR",
        OrchestratorError::EngineNotRegistered(_) => "ENGINE_NOT_REGISTERED",
        OrchestratorError::Time(_) => "TIME_ERROR",
    }
}

const fn store_status(error: &ArtifactStoreError) -> StatusCode {
    match error {
        ArtifactStoreError::DuplicateParent(_)
        | ArtifactStoreError::MissingParent(_)
        | ArtifactStoreError::InvariantViolation(_) => StatusCode::BAD_REQUEST,
        ArtifactStoreError::NotFound(_) => StatusCode::NOT_FOUND,
        ArtifactStoreError::Io(_) | ArtifactStoreError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

const fn store_code(error: &ArtifactStoreError) -> &'static str {
    match error {
        ArtifactStoreError::DuplicateParent(_) => "DUPLICATE_PARENT",
        ArtifactStoreError::MissingParent(_) => "MISSING_PARENT",
        ArtifactStoreError::InvariantViolation(_) => "INVARIANT_VIOLATION",
        ArtifactStoreError::NotFound(_) => "NOT_FOUND",
        ArtifactStoreError::Io(_) | ArtifactStoreError::Store(_) => "STORE_UNAVAILABLE",
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parent_maps_to_bad_request() {
        let error = IngressError::Store(ArtifactStoreError::MissingParent("spec_x".to_string()));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), "MISSING_PARENT");
    }

    #[test]
    fn not_found_maps_to_404() {
        let error = IngressError::Store(ArtifactStoreError::NotFound("artifact_x".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_io_failure_maps_to_503() {
        let error = IngressError::Store(ArtifactStoreError::Io("disk full".to_string()));
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn feasibility_blocked_maps_to_bad_request() {
        let error = IngressError::Orchestrator(OrchestratorError::FeasibilityBlocked(rmos_core::ArtifactId::new("plan_1")));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), "FEASIBILITY_BLOCKED");
    }
}
