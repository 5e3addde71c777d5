// rmos-ingress/src/advisory.rs
// ============================================================================
// Module: Advisory Registry
// Description: In-memory, non-durable index of advisory attachments per Run.
// Purpose: Back the `list_advisories`/`verify_run_attachments` read surface
//          without promoting advisory metadata to authoritative state.
// Dependencies: rmos-core
// ============================================================================

//! ## Overview
//! Advisory input references are append-only metadata linking a Run to a
//! canonical advisory payload; they are never written as artifacts and are
//! lost on restart. The registry's only job is to let callers list and
//! verify what has been suggested-and-attached to a Run during its process
//! lifetime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use rmos_core::AdvisoryInputReference;
use rmos_core::RunRoot;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Non-durable registry of advisory input references, keyed by Run root.
pub struct AdvisoryRegistry {
    runs: Mutex<HashMap<RunRoot, Vec<AdvisoryInputReference>>>,
}

impl Default for AdvisoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Appends an advisory input reference to a Run's ordered list.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned, which indicates a
    /// prior panic elsewhere while holding the lock.
    pub fn append(&self, run_root: RunRoot, reference: AdvisoryInputReference) {
        #[allow(clippy::unwrap_used, reason = "mutex poisoning here indicates a prior panic bug, not a recoverable condition")]
        self.runs.lock().unwrap().entry(run_root).or_default().push(reference);
    }

    /// Lists every advisory input reference attached to a Run, in the order
    /// they were appended.
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned.
    #[must_use]
    pub fn list(&self, run_root: &RunRoot) -> Vec<AdvisoryInputReference> {
        #[allow(clippy::unwrap_used, reason = "mutex poisoning here indicates a prior panic bug, not a recoverable condition")]
        self.runs.lock().unwrap().get(run_root).cloned().unwrap_or_default()
    }

    /// Returns `true` if every advisory reference attached to `run_root` is
    /// `Ready` (none `Pending` or `Failed`).
    ///
    /// # Panics
    ///
    /// Panics only if the internal mutex is poisoned.
    #[must_use]
    pub fn all_ready(&self, run_root: &RunRoot) -> bool {
        self.list(run_root)
            .iter()
            .all(|reference| reference.status == rmos_core::AdvisoryStatus::Ready)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panics are acceptable.")]

    use rmos_core::AdvisoryStatus;
    use rmos_core::ArtifactId;
    use rmos_core::AttachmentKind;
    use rmos_core::RequestId;
    use rmos_core::Sha256Hex;

    use super::*;

    fn reference(status: AdvisoryStatus) -> AdvisoryInputReference {
        AdvisoryInputReference {
            sha256: Sha256Hex::new("a".repeat(64)),
            kind: AttachmentKind::AdvisoryPayload,
            producer_id: "ai-sandbox-1".to_string(),
            request_id: RequestId::new("req_1"),
            created_at_utc: "2026-01-01T00:00:00Z".to_string(),
            status,
        }
    }

    #[test]
    fn appended_references_are_listed_in_order() {
        let registry = AdvisoryRegistry::new();
        let run = ArtifactId::new("spec_1");
        registry.append(run.clone(), reference(AdvisoryStatus::Ready));
        registry.append(run.clone(), reference(AdvisoryStatus::Pending));
        assert_eq!(registry.list(&run).len(), 2);
    }

    #[test]
    fn unknown_run_has_no_references() {
        let registry = AdvisoryRegistry::new();
        assert!(registry.list(&ArtifactId::new("spec_unknown")).is_empty());
    }

    #[test]
    fn all_ready_is_false_when_any_reference_is_pending() {
        let registry = AdvisoryRegistry::new();
        let run = ArtifactId::new("spec_1");
        registry.append(run.clone(), reference(AdvisoryStatus::Ready));
        registry.append(run.clone(), reference(AdvisoryStatus::Pending));
        assert!(!registry.all_ready(&run));
    }

    #[test]
    fn all_ready_is_true_for_an_empty_run() {
        let registry = AdvisoryRegistry::new();
        assert!(registry.all_ready(&ArtifactId::new("spec_empty")));
    }
}
