// rmos-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: RMOS Pipeline Orchestrator
// Description: Drives SPEC -> PLAN -> DECISION -> EXECUTION, enforcing every
//              ancestry and feasibility invariant along the way.
// Purpose: The single call path every ingress route must go through to write
//          an artifact; routers never embed this logic.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The [`Orchestrator`] is the sole writer of authoritative artifacts. It
//! calls the Feasibility Engine and a registered [`ComputationEngine`] at
//! fixed hooks and enforces the stage contract table from the artifact
//! model: required parent links, `batch_label`/`session_id` inheritance,
//! the RED-blocks-approval rule, and drift detection between PLAN and
//! EXECUTION.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::Artifact;
use crate::core::ArtifactId;
use crate::core::ArtifactStatus;
use crate::core::BatchLabel;
use crate::core::Bucket;
use crate::core::Clock;
use crate::core::DesignItem;
use crate::core::FeasibilityEngine;
use crate::core::FeasibilityInput;
use crate::core::FeasibilityVerdict;
use crate::core::HashAlgorithm;
use crate::core::IndexMeta;
use crate::core::JobMetrics;
use crate::core::LearningDecision;
use crate::core::LearningDecisionOutcome;
use crate::core::LearningEvent;
use crate::core::LearningMultipliers;
use crate::core::LearningOverride;
use crate::core::MachiningContext;
use crate::core::ParentLinks;
use crate::core::PrincipalId;
use crate::core::SessionId;
use crate::core::Stage;
use crate::core::ToolKind;
use crate::core::hashing::hash_bytes;
use crate::core::time::to_rfc3339;
use crate::interfaces::ArtifactStore;
use crate::interfaces::ArtifactStoreError;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::interfaces::ComputationEngine;
use crate::interfaces::EngineError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error taxonomy surfaced by the orchestrator, matching the propagation
/// rules in the error-handling design: validation and invariant errors map
/// to HTTP 4xx, engine errors are captured into the artifact chain as
/// HTTP 2xx-with-`ERROR`-status, and store/timeout errors map to HTTP 5xx.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed request or schema violation; no artifact written.
    #[error("validation error: {0}")]
    Validation(String),
    /// A referenced parent does not resolve or an ancestry invariant failed.
    #[error(transparent)]
    Store(#[from] ArtifactStoreError),
    /// A blob operation failed.
    #[error(transparent)]
    Blob(#[from] BlobStoreError),
    /// Approve or execute was attempted against a RED feasibility verdict.
    #[error("feasibility blocked: plan `{0}` carries a RED verdict")]
    FeasibilityBlocked(ArtifactId),
    /// The recomputed feasibility fingerprint differs from the PLAN's.
    #[error("drift detected: recomputed inputs fingerprint no longer matches plan `{0}`")]
    DriftDetected(ArtifactId),
    /// The feasibility engine itself failed to evaluate.
    #[error(transparent)]
    Feasibility(#[from] crate::core::FeasibilityError),
    /// No computation engine is registered for the requested tool kind.
    #[error("no computation engine registered for tool kind `{0}`")]
    EngineNotRegistered(ToolKind),
    /// Timestamp formatting failed.
    #[error(transparent)]
    Time(#[from] crate::core::TimeError),
}

// ============================================================================
// SECTION: Request / Response Shapes
// ============================================================================

/// Inputs required to create a SPEC.
#[derive(Debug, Clone)]
pub struct CreateSpecRequest {
    /// Session identifier for the new Run.
    pub session_id: SessionId,
    /// Batch label for the new Run.
    pub batch_label: BatchLabel,
    /// Tool kind lane this SPEC belongs to, e.g. `saw_batch`.
    pub tool_kind: ToolKind,
    /// Items in the batch.
    pub items: Vec<DesignItem>,
    /// Operation type, e.g. `slice`.
    pub op_type: String,
    /// Blade or bit identifier.
    pub blade_id: Option<String>,
    /// Machine profile identifier.
    pub machine_profile: Option<String>,
}

/// Inputs required to create a PLAN.
#[derive(Debug, Clone)]
pub struct CreatePlanRequest {
    /// The SPEC this PLAN derives from.
    pub spec_id: ArtifactId,
    /// The machining context to score feasibility against.
    pub context: MachiningContext,
}

/// Result of a successful `create_plan` call.
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// The newly written PLAN artifact identifier.
    pub plan_id: ArtifactId,
    /// The feasibility verdict recorded on the PLAN.
    pub verdict: FeasibilityVerdict,
}

/// Result of a successful `execute` call.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The newly written EXECUTION artifact identifier.
    pub execution_id: ArtifactId,
    /// SHA-256 digests of every attachment produced.
    pub attachment_sha256: Vec<String>,
}

// ============================================================================
// SECTION: Orchestrator Configuration
// ============================================================================

/// Per-tool feedback flags, injected at construction rather than read from
/// module-level mutable globals.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackFlags {
    /// Emit a LEARNING_EVENT from JOB_LOG metrics.
    pub learning_hook_enabled: bool,
    /// Emit a ROLLUP alongside each JOB_LOG.
    pub metrics_rollup_hook_enabled: bool,
    /// Consult the overrides store in `create_plan`.
    pub apply_accepted_overrides: bool,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Drives the SPEC -> PLAN -> DECISION -> EXECUTION progression.
pub struct Orchestrator<S, B> {
    store: S,
    blobs: B,
    clock: Arc<dyn Clock>,
    feasibility: FeasibilityEngine,
    engines: BTreeMap<String, Arc<dyn ComputationEngine>>,
    overrides: Arc<Mutex<Vec<LearningOverride>>>,
    flags: FeedbackFlags,
}

impl<S, B> Orchestrator<S, B>
where
    S: ArtifactStore,
    B: BlobStore,
{
    /// Constructs a new orchestrator.
    #[must_use]
    pub fn new(
        store: S,
        blobs: B,
        clock: Arc<dyn Clock>,
        feasibility: FeasibilityEngine,
        flags: FeedbackFlags,
    ) -> Self {
        Self {
            store,
            blobs,
            clock,
            feasibility,
            engines: BTreeMap::new(),
            overrides: Arc::new(Mutex::new(Vec::new())),
            flags,
        }
    }

    /// Registers a computation engine for its declared tool kind.
    pub fn register_engine(&mut self, engine: Arc<dyn ComputationEngine>) {
        self.engines.insert(engine.tool_kind().as_str().to_string(), engine);
    }

    /// Returns the number of computation engines currently registered.
    #[must_use]
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Records an accepted learning override, making it visible to future
    /// `create_plan` calls when `apply_accepted_overrides` is enabled.
    ///
    /// # Panics
    ///
    /// Panics only if the internal overrides mutex is poisoned, which
    /// indicates a prior panic elsewhere while holding the lock.
    pub fn accept_override(&self, override_: LearningOverride) {
        #[allow(clippy::unwrap_used, reason = "mutex poisoning here indicates a prior panic bug, not a recoverable condition")]
        self.overrides.lock().unwrap().push(override_);
    }

    fn now(&self) -> Result<String, OrchestratorError> {
        Ok(to_rfc3339(self.clock.now_utc())?)
    }

    fn lookup_override(&self, context: &MachiningContext) -> Option<LearningMultipliers> {
        if !self.flags.apply_accepted_overrides {
            return None;
        }
        let key = context.override_key();
        #[allow(clippy::unwrap_used, reason = "mutex poisoning here indicates a prior panic bug, not a recoverable condition")]
        let guard = self.overrides.lock().unwrap();
        guard
            .iter()
            .find(|o| {
                (o.tool_id.clone(), o.material_id.clone(), o.operation_kind.clone(), o.machine_profile_id.clone())
                    == key
            })
            .map(|o| o.multipliers)
    }

    // ------------------------------------------------------------------
    // create_spec
    // ------------------------------------------------------------------

    /// Validates `request` and writes a new SPEC artifact.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validation`] if the batch is empty;
    /// [`OrchestratorError::Store`] on store failure.
    pub fn create_spec(&self, request: CreateSpecRequest) -> Result<ArtifactId, OrchestratorError> {
        if request.items.is_empty() {
            return Err(OrchestratorError::Validation(
                "spec must contain at least one item".to_string(),
            ));
        }

        let payload = json!({
            "items": request.items,
            "op_type": request.op_type,
            "blade_id": request.blade_id,
            "machine_profile": request.machine_profile,
        });
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        // SPEC creation is the one stage that permits identical payloads
        // across distinct Runs (`forbids_duplicates(Stage::Spec) == false`),
        // so the artifact id must be scoped to the run rather than the raw
        // content hash alone, or two sessions submitting the same design
        // would collide on the same primary key.
        let id_seed = json!({
            "payload_sha256": payload_sha256,
            "session_id": request.session_id,
            "batch_label": request.batch_label,
        });
        let id_hash = hash_bytes(HashAlgorithm::Sha256, id_seed.to_string().as_bytes()).value;
        let artifact_id = ArtifactId::new(format!("spec_{id_hash}"));

        let artifact = Artifact {
            artifact_id: artifact_id.clone(),
            kind: format!("{}_spec", request.tool_kind),
            stage: Stage::Spec,
            created_at_utc: self.now()?,
            created_by: None,
            parent_ids: ParentLinks::new(),
            index_meta: IndexMeta::root(request.tool_kind, request.batch_label, request.session_id),
            payload_sha256,
            version_stamps: crate::core::VersionStamps::default(),
            status: ArtifactStatus::Created,
            payload,
        };
        self.store.put_artifact(artifact)?;
        Ok(artifact_id)
    }

    // ------------------------------------------------------------------
    // create_plan
    // ------------------------------------------------------------------

    /// Invokes the Feasibility Engine against the linked SPEC and records
    /// the verdict on a new PLAN artifact.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] if the SPEC does not resolve;
    /// [`OrchestratorError::Feasibility`] if scoring fails.
    pub fn create_plan(&self, request: CreatePlanRequest) -> Result<PlanResult, OrchestratorError> {
        let spec = self.store.get_artifact(&request.spec_id)?;
        let feasibility_input = feasibility_input_from_spec(&spec, &request.context)?;

        let adjusted_context = self
            .lookup_override(&request.context)
            .map_or_else(|| request.context.clone(), |multipliers| {
                let mut adjusted = request.context.clone();
                adjusted.cutting_parameters = adjusted.cutting_parameters.scaled_by(multipliers);
                adjusted
            });
        let mut scored_input = feasibility_input;
        scored_input.context = adjusted_context.clone();
        let verdict = self.feasibility.evaluate(&scored_input)?;

        let plan_id = ArtifactId::new(format!("plan_{}", verdict.inputs_fingerprint));
        let payload = json!({
            "raw_context": request.context,
            "adjusted_context": adjusted_context,
            "feasibility": verdict,
        });
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;

        let artifact = Artifact {
            artifact_id: plan_id.clone(),
            kind: spec.kind.replace("_spec", "_plan"),
            stage: Stage::Plan,
            created_at_utc: self.now()?,
            created_by: None,
            parent_ids: ParentLinks::new().with("parent_spec_artifact_id", request.spec_id),
            index_meta: spec.index_meta.inherit(),
            payload_sha256,
            version_stamps: crate::core::VersionStamps {
                engine_version: Some(verdict.engine_version.clone()),
                ..crate::core::VersionStamps::default()
            },
            status: ArtifactStatus::Ok,
            payload,
        };
        self.store.put_artifact(artifact)?;
        Ok(PlanResult { plan_id, verdict })
    }

    // ------------------------------------------------------------------
    // approve / reject
    // ------------------------------------------------------------------

    /// Writes a DECISION artifact with status APPROVED.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::FeasibilityBlocked`] if the linked
    /// PLAN's verdict bucket is RED.
    pub fn approve(
        &self,
        plan_id: &ArtifactId,
        spec_id: &ArtifactId,
        approved_by: PrincipalId,
        reason: &str,
    ) -> Result<ArtifactId, OrchestratorError> {
        let plan = self.store.get_artifact(plan_id)?;
        let bucket: Bucket = serde_json::from_value(plan.payload["feasibility"]["bucket"].clone())
            .map_err(|_| OrchestratorError::Validation("plan is missing a feasibility verdict".to_string()))?;
        if bucket == Bucket::Red {
            return Err(OrchestratorError::FeasibilityBlocked(plan_id.clone()));
        }
        self.write_decision(plan_id, spec_id, approved_by, reason, ArtifactStatus::Approved)
    }

    /// Writes a DECISION artifact with status REJECTED. Rejection is always
    /// permitted regardless of feasibility.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] on store failure.
    pub fn reject(
        &self,
        plan_id: &ArtifactId,
        spec_id: &ArtifactId,
        approved_by: PrincipalId,
        reason: &str,
    ) -> Result<ArtifactId, OrchestratorError> {
        self.write_decision(plan_id, spec_id, approved_by, reason, ArtifactStatus::Rejected)
    }

    fn write_decision(
        &self,
        plan_id: &ArtifactId,
        spec_id: &ArtifactId,
        approved_by: PrincipalId,
        reason: &str,
        status: ArtifactStatus,
    ) -> Result<ArtifactId, OrchestratorError> {
        let plan = self.store.get_artifact(plan_id)?;
        let payload = json!({"reason": reason, "approved_by": approved_by});
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        let decision_id = ArtifactId::new(format!("decision_{payload_sha256}_{plan_id}"));

        let mut index_meta = plan.index_meta.inherit();
        index_meta.approved_by = Some(approved_by.clone());

        let artifact = Artifact {
            artifact_id: decision_id.clone(),
            kind: plan.kind.replace("_plan", "_decision"),
            stage: Stage::Decision,
            created_at_utc: self.now()?,
            created_by: Some(approved_by),
            parent_ids: ParentLinks::new()
                .with("parent_plan_artifact_id", plan_id.clone())
                .with("parent_spec_artifact_id", spec_id.clone()),
            index_meta,
            payload_sha256,
            version_stamps: crate::core::VersionStamps::default(),
            status,
            payload,
        };
        self.store.put_artifact(artifact)?;
        Ok(decision_id)
    }

    // ------------------------------------------------------------------
    // execute / retry_execution
    // ------------------------------------------------------------------

    /// Re-invokes the Feasibility Engine against the DECISION's linked SPEC
    /// and the current context, then, if the recomputed fingerprint matches
    /// the PLAN's, invokes the registered computation engine and writes the
    /// result as an EXECUTION artifact.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::DriftDetected`] if the recomputed
    /// fingerprint no longer matches the PLAN's;
    /// [`OrchestratorError::EngineNotRegistered`] if no engine serves the
    /// SPEC's tool kind. Engine failures are captured into the EXECUTION
    /// artifact rather than propagated.
    pub fn execute(
        &self,
        decision_id: &ArtifactId,
        context: &MachiningContext,
    ) -> Result<ExecutionResult, OrchestratorError> {
        let decision = self.store.get_artifact(decision_id)?;
        if decision.status != ArtifactStatus::Approved {
            return Err(OrchestratorError::Validation(
                "execute requires an APPROVED decision".to_string(),
            ));
        }
        let plan_id = decision
            .parent("parent_plan_artifact_id")
            .ok_or_else(|| OrchestratorError::Validation("decision is missing its plan parent".to_string()))?
            .clone();
        let spec_id = decision
            .parent("parent_spec_artifact_id")
            .ok_or_else(|| OrchestratorError::Validation("decision is missing its spec parent".to_string()))?
            .clone();
        let plan = self.store.get_artifact(&plan_id)?;
        let spec = self.store.get_artifact(&spec_id)?;

        let recomputed = self
            .feasibility
            .evaluate(&feasibility_input_from_spec(&spec, context)?)?;
        let plan_fingerprint = plan.payload["feasibility"]["inputs_fingerprint"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if recomputed.bucket == Bucket::Red {
            return Err(OrchestratorError::FeasibilityBlocked(plan_id));
        }
        if recomputed.inputs_fingerprint != plan_fingerprint {
            return Err(OrchestratorError::DriftDetected(plan_id));
        }

        let engine = self
            .engines
            .get(spec.index_meta.tool_kind.as_str())
            .ok_or_else(|| OrchestratorError::EngineNotRegistered(spec.index_meta.tool_kind.clone()))?;

        self.write_execution(&spec, &decision_id.clone(), engine.as_ref(), context, &recomputed)
    }

    /// Creates a **new** EXECUTION artifact sharing the same DECISION
    /// parent as `execution_id`; does not modify the original.
    ///
    /// # Errors
    ///
    /// Returns the same error set as [`Orchestrator::execute`].
    pub fn retry_execution(
        &self,
        execution_id: &ArtifactId,
        context: &MachiningContext,
    ) -> Result<ExecutionResult, OrchestratorError> {
        let original = self.store.get_artifact(execution_id)?;
        let decision_id = original
            .parent("parent_decision_artifact_id")
            .ok_or_else(|| OrchestratorError::Validation("execution is missing its decision parent".to_string()))?
            .clone();
        self.execute(&decision_id, context)
    }

    fn write_execution(
        &self,
        spec: &Artifact,
        decision_id: &ArtifactId,
        engine: &dyn ComputationEngine,
        context: &MachiningContext,
        verdict: &FeasibilityVerdict,
    ) -> Result<ExecutionResult, OrchestratorError> {
        let engine_result = engine.invoke(&spec.payload, context, verdict);

        let (status, payload, attachment_sha256) = match engine_result {
            Ok(output) => {
                let mut shas = Vec::new();
                for blob in &output.blobs {
                    let sha256 = self.blobs.put_blob(
                        &blob.bytes,
                        &blob.mime,
                        blob.kind,
                        Some(&blob.filename),
                    )?;
                    shas.push(sha256.to_string());
                }
                (
                    ArtifactStatus::Ok,
                    json!({"summary": output.summary, "attachments": shas, "engine_version": output.engine_version}),
                    shas,
                )
            }
            Err(EngineError::Failed(detail)) => (
                ArtifactStatus::Error,
                json!({"error": detail}),
                Vec::new(),
            ),
        };

        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        // The engine is pure with respect to its declared inputs, so replaying
        // the same decision via `retry_execution` reproduces this same
        // payload hash. Mix in the count of executions already recorded
        // against this decision so a retry always mints a fresh artifact id
        // rather than colliding with the original on the primary key.
        let retry_sequence = self.store.list_executions_for_decision(decision_id)?.len();
        let execution_id =
            ArtifactId::new(format!("execution_{payload_sha256}_{}_{retry_sequence}", attachment_sha256.len()));

        let artifact = Artifact {
            artifact_id: execution_id.clone(),
            kind: spec.kind.replace("_spec", "_execution"),
            stage: Stage::Execution,
            created_at_utc: self.now()?,
            created_by: None,
            parent_ids: ParentLinks::new().with("parent_decision_artifact_id", decision_id.clone()),
            index_meta: spec.index_meta.inherit(),
            payload_sha256,
            version_stamps: crate::core::VersionStamps {
                engine_version: Some(verdict.engine_version.clone()),
                ..crate::core::VersionStamps::default()
            },
            status,
            payload,
        };
        self.store.put_artifact(artifact)?;
        Ok(ExecutionResult {
            execution_id,
            attachment_sha256,
        })
    }

    // ------------------------------------------------------------------
    // write_job_log
    // ------------------------------------------------------------------

    /// Persists a JOB_LOG artifact linked to the given EXECUTION and
    /// DECISION.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] if either parent does not
    /// resolve.
    pub fn write_job_log(
        &self,
        execution_id: &ArtifactId,
        decision_id: &ArtifactId,
        metrics: JobMetrics,
    ) -> Result<ArtifactId, OrchestratorError> {
        let execution = self.store.get_artifact(execution_id)?;
        let payload = json!({"metrics": metrics});
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        let job_log_id = ArtifactId::new(format!("job_log_{payload_sha256}"));

        let artifact = Artifact {
            artifact_id: job_log_id.clone(),
            kind: execution.kind.replace("_execution", "_job_log"),
            stage: Stage::JobLog,
            created_at_utc: self.now()?,
            created_by: None,
            parent_ids: ParentLinks::new()
                .with("parent_execution_artifact_id", execution_id.clone())
                .with("parent_decision_artifact_id", decision_id.clone()),
            index_meta: execution.index_meta.inherit(),
            payload_sha256,
            version_stamps: crate::core::VersionStamps::default(),
            status: ArtifactStatus::Ok,
            payload,
        };
        self.store.put_artifact(artifact)?;

        if self.flags.metrics_rollup_hook_enabled {
            self.write_rollup(execution_id, decision_id, &metrics)?;
        }
        if self.flags.learning_hook_enabled {
            self.emit_learning_event(&job_log_id, &metrics)?;
        }
        Ok(job_log_id)
    }

    fn write_rollup(
        &self,
        execution_id: &ArtifactId,
        decision_id: &ArtifactId,
        metrics: &JobMetrics,
    ) -> Result<ArtifactId, OrchestratorError> {
        let execution = self.store.get_artifact(execution_id)?;
        let payload = json!({
            "total_seconds": metrics.total_seconds,
            "yield_rate": metrics.yield_rate(),
            "event_counts": {
                "burn": metrics.burn_events,
                "tearout": metrics.tearout_events,
                "kickback": metrics.kickback_events,
                "chatter": metrics.chatter_events,
                "tool_wear": metrics.tool_wear_events,
            },
        });
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        let rollup_id = ArtifactId::new(format!("rollup_{payload_sha256}"));

        let artifact = Artifact {
            artifact_id: rollup_id.clone(),
            kind: execution.kind.replace("_execution", "_rollup"),
            stage: Stage::Rollup,
            created_at_utc: self.now()?,
            created_by: None,
            parent_ids: ParentLinks::new()
                .with("parent_execution_artifact_id", execution_id.clone())
                .with("parent_decision_artifact_id", decision_id.clone()),
            index_meta: execution.index_meta.inherit(),
            payload_sha256,
            version_stamps: crate::core::VersionStamps::default(),
            status: ArtifactStatus::Ok,
            payload,
        };
        self.store.put_artifact(artifact)?;
        Ok(rollup_id)
    }

    // ------------------------------------------------------------------
    // learning events / decisions
    // ------------------------------------------------------------------

    fn emit_learning_event(
        &self,
        job_log_id: &ArtifactId,
        metrics: &JobMetrics,
    ) -> Result<ArtifactId, OrchestratorError> {
        let job_log = self.store.get_artifact(job_log_id)?;
        let event = LearningEvent::derive_from_metrics(metrics);
        let payload = json!({"learning_event": event});
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        let learning_event_id = ArtifactId::new(format!("learning_event_{payload_sha256}"));

        let artifact = Artifact {
            artifact_id: learning_event_id.clone(),
            kind: job_log.kind.replace("_job_log", "_learning_event"),
            stage: Stage::LearningEvent,
            created_at_utc: self.now()?,
            created_by: None,
            parent_ids: ParentLinks::new().with("parent_job_log_artifact_id", job_log_id.clone()),
            index_meta: job_log.index_meta.inherit(),
            payload_sha256,
            version_stamps: crate::core::VersionStamps::default(),
            status: ArtifactStatus::Created,
            payload,
        };
        self.store.put_artifact(artifact)?;
        Ok(learning_event_id)
    }

    /// Records an operator's (or governance policy's) disposition of a
    /// LEARNING_EVENT. Accepting persists the event's proposed multipliers
    /// as a [`LearningOverride`], keyed by the machining context recorded on
    /// the PLAN in the event's lineage; the override becomes visible to
    /// future `create_plan` calls once `apply_accepted_overrides` is set.
    /// Rejecting writes the disposition without mutating the overrides
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] if `learning_event_id` does not
    /// resolve; [`OrchestratorError::Validation`] if an accepted event's
    /// lineage is missing its PLAN or carries a malformed context.
    pub fn record_learning_decision(
        &self,
        learning_event_id: &ArtifactId,
        decided_by: PrincipalId,
        outcome: LearningDecisionOutcome,
        reason: Option<String>,
    ) -> Result<ArtifactId, OrchestratorError> {
        let learning_event = self.store.get_artifact(learning_event_id)?;
        let decision = LearningDecision {
            outcome,
            decided_by: decided_by.clone(),
            reason,
        };
        let payload = json!({"decision": decision});
        let payload_sha256 = hash_bytes(HashAlgorithm::Sha256, payload.to_string().as_bytes()).value;
        let learning_decision_id = ArtifactId::new(format!("learning_decision_{payload_sha256}"));

        let artifact = Artifact {
            artifact_id: learning_decision_id.clone(),
            kind: learning_event.kind.replace("_learning_event", "_learning_decision"),
            stage: Stage::LearningDecision,
            created_at_utc: self.now()?,
            created_by: Some(decided_by.clone()),
            parent_ids: ParentLinks::new()
                .with("parent_learning_event_artifact_id", learning_event_id.clone()),
            index_meta: learning_event.index_meta.inherit(),
            payload_sha256,
            version_stamps: crate::core::VersionStamps::default(),
            status: ArtifactStatus::Ok,
            payload,
        };
        self.store.put_artifact(artifact)?;

        if outcome == LearningDecisionOutcome::Accepted {
            let event: LearningEvent =
                serde_json::from_value(learning_event.payload["learning_event"].clone()).map_err(|err| {
                    OrchestratorError::Validation(format!("learning event payload is malformed: {err}"))
                })?;
            let lineage = self.store.get_lineage(learning_event_id)?;
            let plan = lineage
                .iter()
                .find(|artifact| artifact.stage == Stage::Plan)
                .ok_or_else(|| {
                    OrchestratorError::Validation("learning event lineage is missing its plan".to_string())
                })?;
            let context: MachiningContext =
                serde_json::from_value(plan.payload["adjusted_context"].clone()).map_err(|err| {
                    OrchestratorError::Validation(format!("plan context is malformed: {err}"))
                })?;
            self.accept_override(LearningOverride {
                tool_id: context.tool_id,
                material_id: context.material_id,
                operation_kind: context.operation_kind,
                machine_profile_id: context.machine_profile_id,
                multipliers: event.proposed_multipliers,
                accepted_by: decided_by,
            });
        }
        Ok(learning_decision_id)
    }

    /// Returns `true` if the learning-event hook is enabled for this
    /// orchestrator instance.
    #[must_use]
    pub const fn learning_hook_enabled(&self) -> bool {
        self.flags.learning_hook_enabled
    }

    /// Exposes the underlying artifact store for read-only query surfaces
    /// (e.g. the Run / attachment ingress routes).
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Exposes the underlying blob store for read-only query surfaces.
    #[must_use]
    pub const fn blobs(&self) -> &B {
        &self.blobs
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn feasibility_input_from_spec(
    spec: &Artifact,
    context: &MachiningContext,
) -> Result<FeasibilityInput, OrchestratorError> {
    let items: Vec<DesignItem> = serde_json::from_value(spec.payload["items"].clone())
        .map_err(|err| OrchestratorError::Validation(format!("spec payload is malformed: {err}")))?;
    let op_type = spec.payload["op_type"].as_str().unwrap_or_default().to_string();
    let blade_id = value_as_optional_string(&spec.payload["blade_id"]);
    let machine_profile = value_as_optional_string(&spec.payload["machine_profile"]);

    Ok(FeasibilityInput {
        items,
        op_type,
        blade_id,
        machine_profile,
        batch_label: spec.index_meta.batch_label.to_string(),
        session_id: spec.index_meta.session_id.to_string(),
        context: context.clone(),
    })
}

fn value_as_optional_string(value: &Value) -> Option<String> {
    value.as_str().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;
    use crate::core::AttachmentKind;
    use crate::core::MaterialId;
    use crate::core::OperationKind;
    use crate::core::ToolId;
    use crate::core::time::SystemClock;
    use crate::runtime::store::InMemoryArtifactStore;
    use std::collections::BTreeMap as Map;

    struct NoopEngine;

    impl ComputationEngine for NoopEngine {
        fn tool_kind(&self) -> ToolKind {
            ToolKind::new("saw_batch")
        }

        fn invoke(
            &self,
            _spec_payload: &Value,
            _context: &MachiningContext,
            verdict: &FeasibilityVerdict,
        ) -> Result<crate::interfaces::EngineOutput, EngineError> {
            Ok(crate::interfaces::EngineOutput {
                blobs: vec![crate::interfaces::ProducedBlob {
                    bytes: b"G1 X0 Y0".to_vec(),
                    mime: "text/plain".to_string(),
                    filename: "out.gcode".to_string(),
                    kind: AttachmentKind::GcodeOutput,
                }],
                summary: json!({"moves": 1}),
                engine_version: verdict.engine_version.clone(),
            })
        }
    }

    struct InMemoryBlobs {
        blobs: Mutex<Map<String, Vec<u8>>>,
    }

    impl InMemoryBlobs {
        fn new() -> Self {
            Self {
                blobs: Mutex::new(Map::new()),
            }
        }
    }

    impl BlobStore for InMemoryBlobs {
        fn put_blob(
            &self,
            bytes: &[u8],
            _mime: &str,
            _kind: AttachmentKind,
            _filename: Option<&str>,
        ) -> Result<crate::core::Sha256Hex, BlobStoreError> {
            let digest = hash_bytes(HashAlgorithm::Sha256, bytes);
            #[allow(clippy::unwrap_used, reason = "test-only mutex")]
            self.blobs
                .lock()
                .unwrap()
                .insert(digest.value.clone(), bytes.to_vec());
            Ok(digest.as_sha256_hex())
        }

        fn get_blob(&self, sha256: &crate::core::Sha256Hex) -> Result<Vec<u8>, BlobStoreError> {
            #[allow(clippy::unwrap_used, reason = "test-only mutex")]
            self.blobs
                .lock()
                .unwrap()
                .get(sha256.as_str())
                .cloned()
                .ok_or_else(|| BlobStoreError::NotFound(sha256.to_string()))
        }

        fn meta_index_query(
            &self,
            _kind: Option<AttachmentKind>,
            _mime_prefix: Option<&str>,
            _cursor: Option<&str>,
            _limit: usize,
        ) -> Result<crate::interfaces::MetaIndexPage, BlobStoreError> {
            Ok(crate::interfaces::MetaIndexPage::default())
        }
    }

    fn context() -> MachiningContext {
        MachiningContext {
            material_id: MaterialId::new("hardwood"),
            tool_id: ToolId::new("BLADE_10IN_60T"),
            machine_profile_id: Some(crate::core::MachineProfileId::new("SAW_LAB_01")),
            project_id: None,
            operation_kind: OperationKind::new("slice"),
            cutting_parameters: crate::core::CuttingParameters {
                rpm: 3600.0,
                feed_mm_min: 1200.0,
                doc_mm: 3.0,
                woc_mm: 6.0,
            },
            feature_flags: Map::new(),
        }
    }

    fn orchestrator() -> Orchestrator<InMemoryArtifactStore, InMemoryBlobs> {
        let mut orchestrator = Orchestrator::new(
            InMemoryArtifactStore::new(),
            InMemoryBlobs::new(),
            Arc::new(SystemClock),
            FeasibilityEngine::new("1.0.0"),
            FeedbackFlags::default(),
        );
        orchestrator.register_engine(Arc::new(NoopEngine));
        orchestrator
    }

    fn happy_path_spec_request() -> CreateSpecRequest {
        CreateSpecRequest {
            session_id: SessionId::new("s1"),
            batch_label: BatchLabel::new("b1"),
            tool_kind: ToolKind::new("saw_batch"),
            items: vec![DesignItem {
                part_id: "p1".to_string(),
                material_family: "hardwood".to_string(),
                thickness_mm: 19.0,
                width_mm: 100.0,
                length_mm: 500.0,
            }],
            op_type: "slice".to_string(),
            blade_id: Some("BLADE_10IN_60T".to_string()),
            machine_profile: Some("SAW_LAB_01".to_string()),
        }
    }

    #[test]
    fn happy_path_reaches_execution_ok() {
        let orchestrator = orchestrator();
        let spec_id = orchestrator.create_spec(happy_path_spec_request()).expect("spec");
        let plan = orchestrator
            .create_plan(CreatePlanRequest {
                spec_id: spec_id.clone(),
                context: context(),
            })
            .expect("plan");
        assert!(matches!(plan.verdict.bucket, Bucket::Green | Bucket::Yellow));

        let decision_id = orchestrator
            .approve(&plan.plan_id, &spec_id, PrincipalId::new("op1"), "looks good")
            .expect("approve");
        let execution = orchestrator.execute(&decision_id, &context()).expect("execute");
        assert_eq!(execution.attachment_sha256.len(), 1);
    }

    #[test]
    fn blocked_approval_rejects_red_plans() {
        let orchestrator = orchestrator();
        let mut request = happy_path_spec_request();
        request.items[0].thickness_mm = 0.0;
        let spec_id = orchestrator.create_spec(request).expect("spec");
        let plan = orchestrator
            .create_plan(CreatePlanRequest {
                spec_id: spec_id.clone(),
                context: context(),
            })
            .expect("plan");
        assert_eq!(plan.verdict.bucket, Bucket::Red);

        let result = orchestrator.approve(&plan.plan_id, &spec_id, PrincipalId::new("op1"), "force");
        assert!(matches!(result, Err(OrchestratorError::FeasibilityBlocked(_))));
    }

    #[test]
    fn drift_is_detected_when_context_changes_between_plan_and_execute() {
        let orchestrator = orchestrator();
        let spec_id = orchestrator.create_spec(happy_path_spec_request()).expect("spec");
        let plan = orchestrator
            .create_plan(CreatePlanRequest {
                spec_id: spec_id.clone(),
                context: context(),
            })
            .expect("plan");
        let decision_id = orchestrator
            .approve(&plan.plan_id, &spec_id, PrincipalId::new("op1"), "ok")
            .expect("approve");

        let mut drifted = context();
        drifted.tool_id = ToolId::new("BLADE_8IN_40T");
        let result = orchestrator.execute(&decision_id, &drifted);
        assert!(matches!(result, Err(OrchestratorError::DriftDetected(_))));
    }

    #[test]
    fn retry_execution_produces_a_new_artifact_with_identical_attachment_hash() {
        let orchestrator = orchestrator();
        let spec_id = orchestrator.create_spec(happy_path_spec_request()).expect("spec");
        let plan = orchestrator
            .create_plan(CreatePlanRequest {
                spec_id: spec_id.clone(),
                context: context(),
            })
            .expect("plan");
        let decision_id = orchestrator
            .approve(&plan.plan_id, &spec_id, PrincipalId::new("op1"), "ok")
            .expect("approve");
        let first = orchestrator.execute(&decision_id, &context()).expect("execute");
        let second = orchestrator
            .retry_execution(&first.execution_id, &context())
            .expect("retry");

        assert_ne!(first.execution_id, second.execution_id);
        assert_eq!(first.attachment_sha256, second.attachment_sha256);
    }
}
