// rmos-core/src/runtime/store.rs
// ============================================================================
// Module: RMOS In-Memory Artifact Store
// Description: Simple in-memory artifact store enforcing ancestry invariants.
// Purpose: Provide a deterministic store implementation for tests and the
//          CLI's ephemeral mode, without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`ArtifactStore`] that
//! enforces the same ancestry invariants a durable backend must: write-once
//! artifacts, resolvable parents, and `batch_label`/`session_id` inheritance
//! from the root SPEC. It is suitable for tests and local demos; production
//! deployments use `rmos-store-sqlite`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Artifact;
use crate::core::ArtifactId;
use crate::core::Stage;
use crate::interfaces::ArtifactQuery;
use crate::interfaces::ArtifactStore;
use crate::interfaces::ArtifactStoreError;

// ============================================================================
// SECTION: Stage Contract Helpers
// ============================================================================

/// Returns the parent-link relationship names required for `stage`, per the
/// pipeline's stage contract table.
fn required_relationships(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Spec => &[],
        Stage::Plan => &["parent_spec_artifact_id"],
        Stage::Decision => &["parent_plan_artifact_id", "parent_spec_artifact_id"],
        Stage::Execution => &["parent_decision_artifact_id"],
        Stage::JobLog | Stage::Rollup => {
            &["parent_execution_artifact_id", "parent_decision_artifact_id"]
        }
        Stage::LearningEvent => &["parent_job_log_artifact_id"],
        Stage::LearningDecision => &["parent_learning_event_artifact_id"],
    }
}

/// Returns the relationship name linking `stage` to its immediate
/// predecessor in the pipeline, used for lineage traversal.
fn primary_relationship(stage: Stage) -> Option<&'static str> {
    required_relationships(stage).first().copied()
}

/// Returns `true` if duplicate `(kind, parent_ids, payload_sha256)` tuples
/// are forbidden for `stage`. SPEC creation may legitimately be repeated
/// with identical payloads (callers deduplicate externally); every
/// downstream stage is write-once per distinct input.
fn forbids_duplicates(stage: Stage) -> bool {
    stage != Stage::Spec
}

// ============================================================================
// SECTION: In-Memory Artifact Store
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    by_id: BTreeMap<ArtifactId, Artifact>,
    dedup_keys: BTreeSet<(String, String, String)>,
}

/// In-memory artifact store for tests and local demos.
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifactStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryArtifactStore {
    /// Creates a new, empty in-memory artifact store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn dedup_key(artifact: &Artifact) -> (String, String, String) {
        let parents = artifact
            .parent_ids
            .iter()
            .map(|(relationship, id)| format!("{relationship}={id}"))
            .collect::<Vec<_>>()
            .join(",");
        (artifact.kind.clone(), parents, artifact.payload_sha256.clone())
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put_artifact(&self, artifact: Artifact) -> Result<ArtifactId, ArtifactStoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ArtifactStoreError::Store("artifact store mutex poisoned".to_string()))?;

        for relationship in required_relationships(artifact.stage) {
            let Some(parent_id) = artifact.parent_ids.get(relationship) else {
                return Err(ArtifactStoreError::MissingParent(format!(
                    "{} requires parent link `{relationship}`",
                    artifact.kind
                )));
            };
            let parent = guard.by_id.get(parent_id).ok_or_else(|| {
                ArtifactStoreError::MissingParent(format!(
                    "parent `{parent_id}` referenced by `{relationship}` does not resolve"
                ))
            })?;
            if parent.index_meta.batch_label != artifact.index_meta.batch_label
                || parent.index_meta.session_id != artifact.index_meta.session_id
            {
                return Err(ArtifactStoreError::InvariantViolation(format!(
                    "batch_label/session_id of `{}` do not match root SPEC's values",
                    artifact.artifact_id
                )));
            }
        }

        if forbids_duplicates(artifact.stage) {
            let key = Self::dedup_key(&artifact);
            if !guard.dedup_keys.insert(key) {
                return Err(ArtifactStoreError::DuplicateParent(format!(
                    "an artifact with identical (kind, parent_ids, payload_sha256) already exists for `{}`",
                    artifact.kind
                )));
            }
        }

        let id = artifact.artifact_id.clone();
        guard.by_id.insert(id.clone(), artifact);
        Ok(id)
    }

    fn get_artifact(&self, artifact_id: &ArtifactId) -> Result<Artifact, ArtifactStoreError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ArtifactStoreError::Store("artifact store mutex poisoned".to_string()))?;
        guard
            .by_id
            .get(artifact_id)
            .cloned()
            .ok_or_else(|| ArtifactStoreError::NotFound(artifact_id.to_string()))
    }

    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<Artifact>, ArtifactStoreError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ArtifactStoreError::Store("artifact store mutex poisoned".to_string()))?;

        let mut matches: Vec<Artifact> = guard
            .by_id
            .values()
            .filter(|artifact| {
                query.kind.as_ref().is_none_or(|kind| &artifact.kind == kind)
                    && query.stage.is_none_or(|stage| artifact.stage == stage)
                    && query
                        .parent_artifact_id
                        .as_ref()
                        .is_none_or(|parent| artifact.parent_ids.iter().any(|(_, id)| id == parent))
                    && query
                        .session_id
                        .as_ref()
                        .is_none_or(|session_id| &artifact.index_meta.session_id == session_id)
                    && query
                        .batch_label
                        .as_ref()
                        .is_none_or(|batch_label| &artifact.index_meta.batch_label == batch_label)
                    && query
                        .tool_kind
                        .as_ref()
                        .is_none_or(|tool_kind| &artifact.index_meta.tool_kind == tool_kind)
                    && query
                        .created_after
                        .as_ref()
                        .is_none_or(|after| &artifact.created_at_utc >= after)
                    && query
                        .created_before
                        .as_ref()
                        .is_none_or(|before| &artifact.created_at_utc <= before)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            a.created_at_utc
                .cmp(&b.created_at_utc)
                .then_with(|| a.artifact_id.cmp(&b.artifact_id))
        });
        Ok(matches)
    }

    fn list_executions_for_decision(
        &self,
        decision_id: &ArtifactId,
    ) -> Result<Vec<Artifact>, ArtifactStoreError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ArtifactStoreError::Store("artifact store mutex poisoned".to_string()))?;
        let mut matches: Vec<Artifact> = guard
            .by_id
            .values()
            .filter(|artifact| {
                artifact.stage == Stage::Execution
                    && artifact.parent("parent_decision_artifact_id") == Some(decision_id)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.created_at_utc
                .cmp(&b.created_at_utc)
                .then_with(|| a.artifact_id.cmp(&b.artifact_id))
        });
        Ok(matches)
    }

    fn get_lineage(&self, artifact_id: &ArtifactId) -> Result<Vec<Artifact>, ArtifactStoreError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ArtifactStoreError::Store("artifact store mutex poisoned".to_string()))?;

        let mut chain = Vec::new();
        let mut current = guard
            .by_id
            .get(artifact_id)
            .cloned()
            .ok_or_else(|| ArtifactStoreError::NotFound(artifact_id.to_string()))?;
        loop {
            let next_relationship = primary_relationship(current.stage);
            chain.push(current.clone());
            let Some(relationship) = next_relationship else {
                break;
            };
            let Some(parent_id) = current.parent(relationship).cloned() else {
                break;
            };
            current = guard
                .by_id
                .get(&parent_id)
                .cloned()
                .ok_or_else(|| ArtifactStoreError::NotFound(parent_id.to_string()))?;
        }
        chain.reverse();
        Ok(chain)
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared artifact store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedArtifactStore {
    /// Inner store implementation.
    inner: Arc<dyn ArtifactStore>,
}

impl SharedArtifactStore {
    /// Wraps an artifact store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl ArtifactStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { inner: store }
    }
}

impl ArtifactStore for SharedArtifactStore {
    fn put_artifact(&self, artifact: Artifact) -> Result<ArtifactId, ArtifactStoreError> {
        self.inner.put_artifact(artifact)
    }

    fn get_artifact(&self, artifact_id: &ArtifactId) -> Result<Artifact, ArtifactStoreError> {
        self.inner.get_artifact(artifact_id)
    }

    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<Artifact>, ArtifactStoreError> {
        self.inner.query_artifacts(query)
    }

    fn list_executions_for_decision(
        &self,
        decision_id: &ArtifactId,
    ) -> Result<Vec<Artifact>, ArtifactStoreError> {
        self.inner.list_executions_for_decision(decision_id)
    }

    fn get_lineage(&self, artifact_id: &ArtifactId) -> Result<Vec<Artifact>, ArtifactStoreError> {
        self.inner.get_lineage(artifact_id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;
    use crate::core::ArtifactStatus;
    use crate::core::BatchLabel;
    use crate::core::IndexMeta;
    use crate::core::ParentLinks;
    use crate::core::SessionId;
    use crate::core::ToolKind;

    fn spec_artifact(id: &str) -> Artifact {
        Artifact {
            artifact_id: ArtifactId::new(id),
            kind: "saw_batch_spec".to_string(),
            stage: Stage::Spec,
            created_at_utc: "2026-01-01T00:00:00Z".to_string(),
            created_by: None,
            parent_ids: ParentLinks::new(),
            index_meta: IndexMeta::root(
                ToolKind::new("saw_batch"),
                BatchLabel::new("b1"),
                SessionId::new("s1"),
            ),
            payload_sha256: "a".repeat(64),
            version_stamps: crate::core::VersionStamps::default(),
            status: ArtifactStatus::Created,
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn put_and_get_round_trips() {
        let store = InMemoryArtifactStore::new();
        let artifact = spec_artifact("spec_1");
        store.put_artifact(artifact.clone()).expect("put");
        let fetched = store.get_artifact(&artifact.artifact_id).expect("get");
        assert_eq!(fetched, artifact);
    }

    #[test]
    fn missing_parent_is_rejected() {
        let store = InMemoryArtifactStore::new();
        let mut plan = spec_artifact("plan_1");
        plan.stage = Stage::Plan;
        plan.kind = "saw_batch_plan".to_string();
        plan.parent_ids = ParentLinks::new()
            .with("parent_spec_artifact_id", ArtifactId::new("does_not_exist"));
        let result = store.put_artifact(plan);
        assert!(matches!(result, Err(ArtifactStoreError::MissingParent(_))));
    }

    #[test]
    fn duplicate_plan_is_rejected() {
        let store = InMemoryArtifactStore::new();
        let spec = spec_artifact("spec_1");
        store.put_artifact(spec.clone()).expect("put spec");

        let mut plan = spec.clone();
        plan.artifact_id = ArtifactId::new("plan_1");
        plan.stage = Stage::Plan;
        plan.kind = "saw_batch_plan".to_string();
        plan.parent_ids = ParentLinks::new().with("parent_spec_artifact_id", spec.artifact_id.clone());

        store.put_artifact(plan.clone()).expect("put first plan");
        let mut plan2 = plan.clone();
        plan2.artifact_id = ArtifactId::new("plan_2");
        let result = store.put_artifact(plan2);
        assert!(matches!(result, Err(ArtifactStoreError::DuplicateParent(_))));
    }

    #[test]
    fn lineage_is_root_first() {
        let store = InMemoryArtifactStore::new();
        let spec = spec_artifact("spec_1");
        store.put_artifact(spec.clone()).expect("put spec");

        let mut plan = spec.clone();
        plan.artifact_id = ArtifactId::new("plan_1");
        plan.stage = Stage::Plan;
        plan.kind = "saw_batch_plan".to_string();
        plan.payload_sha256 = "b".repeat(64);
        plan.parent_ids = ParentLinks::new().with("parent_spec_artifact_id", spec.artifact_id.clone());
        store.put_artifact(plan.clone()).expect("put plan");

        let lineage = store.get_lineage(&plan.artifact_id).expect("lineage");
        assert_eq!(lineage.len(), 2);
        assert_eq!(lineage[0].artifact_id, spec.artifact_id);
        assert_eq!(lineage[1].artifact_id, plan.artifact_id);
    }
}
