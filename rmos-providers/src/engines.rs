// rmos-providers/src/engines.rs
// ============================================================================
// Module: RMOS Reference Computation Engine
// Description: Deterministic placeholder computation engine for tool kinds
//              that have no concrete CAM algorithm linked in.
// Purpose: Let the pipeline exercise the full EXECUTION hook — engine
//          invocation, blob production, determinism — without depending on
//          a real polygon-offset/pocket-spiral/DXF implementation.
// Dependencies: rmos-core
// ============================================================================

//! ## Overview
//! The concrete geometry and post-processing math for saw batches, rosette
//! cutting, V-carving and the rest of the tool lanes is out of scope; what
//! matters to the pipeline is that *some* engine is wired to every tool kind
//! and that it is deterministic for identical inputs. [`ReferenceToolpathEngine`]
//! satisfies the [`ComputationEngine`] contract by hashing its declared
//! inputs into a synthetic G-code body, so replay and drift detection behave
//! exactly as they would against a real post-processor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rmos_core::FeasibilityVerdict;
use rmos_core::MachiningContext;
use rmos_core::ToolKind;
use rmos_core::hashing::HashAlgorithm;
use rmos_core::hashing::hash_canonical_json;
use rmos_core::interfaces::ComputationEngine;
use rmos_core::interfaces::EngineError;
use rmos_core::interfaces::EngineOutput;
use rmos_core::interfaces::ProducedBlob;
use rmos_core::AttachmentKind;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Reference Engine
// ============================================================================

/// A deterministic stand-in computation engine bound to a single tool kind.
///
/// Given identical `(spec_payload, context, verdict)`, two invocations
/// produce byte-identical attachments, satisfying the pipeline's
/// determinism requirement without performing real toolpath computation.
#[derive(Debug, Clone)]
pub struct ReferenceToolpathEngine {
    /// Tool kind this engine serves.
    tool_kind: ToolKind,
    /// Version stamp recorded on every [`EngineOutput`].
    engine_version: String,
}

impl ReferenceToolpathEngine {
    /// Creates a reference engine bound to `tool_kind`.
    #[must_use]
    pub fn new(tool_kind: ToolKind, engine_version: impl Into<String>) -> Self {
        Self {
            tool_kind,
            engine_version: engine_version.into(),
        }
    }

    /// Builds the deterministic synthetic G-code body for this invocation.
    fn synthesize_gcode(&self, digest_hex: &str) -> Vec<u8> {
        format!(
            "; reference toolpath for {}\n; engine {}\n; inputs {}\nG0 X0 Y0 Z0\nM30\n",
            self.tool_kind, self.engine_version, digest_hex
        )
        .into_bytes()
    }
}

impl ComputationEngine for ReferenceToolpathEngine {
    fn tool_kind(&self) -> ToolKind {
        self.tool_kind.clone()
    }

    fn invoke(
        &self,
        spec_payload: &Value,
        context: &MachiningContext,
        verdict: &FeasibilityVerdict,
    ) -> Result<EngineOutput, EngineError> {
        let fingerprint = json!({
            "tool_kind": self.tool_kind.as_str(),
            "spec_payload": spec_payload,
            "context": context,
            "engine_version": self.engine_version,
        });
        let digest = hash_canonical_json(HashAlgorithm::Sha256, &fingerprint)
            .map_err(|err| EngineError::Failed(err.to_string()))?;
        let bytes = self.synthesize_gcode(&digest.value);
        let blob = ProducedBlob {
            bytes,
            mime: "text/plain".to_string(),
            filename: format!("{}.gcode", self.tool_kind.as_str()),
            kind: AttachmentKind::GcodeOutput,
        };
        let summary = json!({
            "tool_kind": self.tool_kind.as_str(),
            "bucket": verdict.bucket,
            "move_count": 2,
            "inputs_fingerprint": verdict.inputs_fingerprint,
        });
        Ok(EngineOutput {
            blobs: vec![blob],
            summary,
            engine_version: self.engine_version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use rmos_core::Bucket;
    use rmos_core::CuttingParameters;
    use rmos_core::MaterialId;
    use rmos_core::OperationKind;
    use rmos_core::ToolId;

    use super::*;

    fn context() -> MachiningContext {
        MachiningContext {
            material_id: MaterialId::new("hardwood_maple"),
            tool_id: ToolId::new("BLADE_10IN_60T"),
            machine_profile_id: None,
            project_id: None,
            operation_kind: OperationKind::new("slice"),
            cutting_parameters: CuttingParameters {
                rpm: 3600.0,
                feed_mm_min: 1200.0,
                doc_mm: 3.0,
                woc_mm: 10.0,
            },
            feature_flags: std::collections::BTreeMap::new(),
        }
    }

    fn verdict() -> FeasibilityVerdict {
        FeasibilityVerdict {
            bucket: Bucket::Green,
            score: 100,
            violations: Vec::new(),
            inputs_fingerprint: "deadbeef".to_string(),
            engine_version: "feasibility-1".to_string(),
        }
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let engine = ReferenceToolpathEngine::new(ToolKind::new("saw_batch"), "reference-1");
        let payload = json!({"op_type": "slice"});
        let first = engine.invoke(&payload, &context(), &verdict()).expect("invoke");
        let second = engine.invoke(&payload, &context(), &verdict()).expect("invoke");
        assert_eq!(first.blobs[0].bytes, second.blobs[0].bytes);
    }

    #[test]
    fn differing_context_changes_output() {
        let engine = ReferenceToolpathEngine::new(ToolKind::new("saw_batch"), "reference-1");
        let payload = json!({"op_type": "slice"});
        let first = engine.invoke(&payload, &context(), &verdict()).expect("invoke");
        let mut altered = context();
        altered.cutting_parameters.rpm = 4200.0;
        let second = engine.invoke(&payload, &altered, &verdict()).expect("invoke");
        assert_ne!(first.blobs[0].bytes, second.blobs[0].bytes);
    }
}
