// rmos-core/src/core/context.rs
// ============================================================================
// Module: RMOS Machining Context
// Description: The environmental envelope feasibility and generation operate
//              under.
// Purpose: Carry material/tool/machine/project identity plus feed/speed
//          parameters subject to learning-override adjustment.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`MachiningContext`] is required input to both the Feasibility Engine
//! and computation engines. Its required fields may only grow in a
//! major-version bump; optional fields may be added in minor versions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use super::identifiers::MachineProfileId;
use super::identifiers::MaterialId;
use super::identifiers::OperationKind;
use super::identifiers::ProjectId;
use super::identifiers::ToolId;

// ============================================================================
// SECTION: Cutting Parameters
// ============================================================================

/// Feed/speed/depth parameters subject to learning-override multiplication.
///
/// Raw values as supplied by the caller are always preserved alongside any
/// adjusted values so the PLAN artifact can record both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CuttingParameters {
    /// Spindle speed, revolutions per minute.
    pub rpm: f64,
    /// Feed rate, millimeters per minute.
    pub feed_mm_min: f64,
    /// Depth of cut, millimeters.
    pub doc_mm: f64,
    /// Width of cut, millimeters.
    pub woc_mm: f64,
}

impl CuttingParameters {
    /// Multiplies each field by the corresponding factor in `multipliers`.
    #[must_use]
    pub fn scaled_by(self, multipliers: super::feedback::LearningMultipliers) -> Self {
        Self {
            rpm: self.rpm * multipliers.rpm,
            feed_mm_min: self.feed_mm_min * multipliers.feed,
            doc_mm: self.doc_mm * multipliers.doc,
            woc_mm: self.woc_mm * multipliers.woc,
        }
    }
}

// ============================================================================
// SECTION: Machining Context
// ============================================================================

/// The environmental envelope under which feasibility and generation operate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachiningContext {
    /// Required: material identifier.
    pub material_id: MaterialId,
    /// Required: tool identifier.
    pub tool_id: ToolId,
    /// Optional: machine profile identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_profile_id: Option<MachineProfileId>,
    /// Optional: project identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// Operation kind, used to key learning overrides.
    pub operation_kind: OperationKind,
    /// Cutting parameters as supplied by the caller.
    pub cutting_parameters: CuttingParameters,
    /// Additional fields carried forward without validation by the core.
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
}

impl MachiningContext {
    /// Returns the override key this context would be looked up under in the
    /// learning overrides store.
    #[must_use]
    pub fn override_key(&self) -> (ToolId, MaterialId, OperationKind, Option<MachineProfileId>) {
        (
            self.tool_id.clone(),
            self.material_id.clone(),
            self.operation_kind.clone(),
            self.machine_profile_id.clone(),
        )
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
    use crate::core::feedback::LearningMultipliers;

    fn sample_context() -> MachiningContext {
        MachiningContext {
            material_id: MaterialId::new("hardwood"),
            tool_id: ToolId::new("BLADE_10IN_60T"),
            machine_profile_id: Some(MachineProfileId::new("SAW_LAB_01")),
            project_id: None,
            operation_kind: OperationKind::new("slice"),
            cutting_parameters: CuttingParameters {
                rpm: 3600.0,
                feed_mm_min: 1200.0,
                doc_mm: 3.0,
                woc_mm: 6.0,
            },
            feature_flags: BTreeMap::new(),
        }
    }

    #[test]
    fn cutting_parameters_scale_by_multiplier() {
        let params = sample_context().cutting_parameters;
        let scaled = params.scaled_by(LearningMultipliers {
            rpm: 1.1,
            feed: 0.9,
            doc: 1.0,
            woc: 1.0,
        });
        assert!((scaled.rpm - 3960.0).abs() < f64::EPSILON);
        assert!((scaled.feed_mm_min - 1080.0).abs() < f64::EPSILON);
    }

    #[test]
    fn override_key_captures_the_four_dimensions() {
        let ctx = sample_context();
        let key = ctx.override_key();
        assert_eq!(key.0, ctx.tool_id);
        assert_eq!(key.1, ctx.material_id);
        assert_eq!(key.2, ctx.operation_kind);
        assert_eq!(key.3, ctx.machine_profile_id);
    }
}
