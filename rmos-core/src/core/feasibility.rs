// rmos-core/src/core/feasibility.rs
// ============================================================================
// Module: RMOS Feasibility Engine
// Description: Deterministic rule-based manufacturability scorer.
// Purpose: Compute GREEN/YELLOW/RED verdicts with machine-readable reasons.
// Dependencies: serde, serde_json, super::hashing
// ============================================================================

//! ## Overview
//! The feasibility engine evaluates a fixed, versioned rule set against a
//! design and its [`MachiningContext`][crate::core::context::MachiningContext],
//! producing a [`FeasibilityVerdict`]. Rules are grouped by severity: core
//! safety rules (F001-F007, HARD), parametric warnings (F010-F013, SOFT),
//! adversarial detectors (F020-F029, HARD), and edge policies (F030-F041,
//! INFO-only). Rules are evaluated and reported in lexicographic `rule_id`
//! order to produce stable diffs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use super::context::MachiningContext;
use super::hashing::HashAlgorithm;
use super::hashing::HashError;
use super::hashing::hash_canonical_json;
use super::identifiers::RuleId;

// ============================================================================
// SECTION: Severity and Bucket
// ============================================================================

/// Severity of a single rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Hard-blocking; any HARD violation forces bucket RED.
    Hard,
    /// Soft warning; any SOFT violation excludes GREEN.
    Soft,
    /// Advisory only; contributes a score penalty but never changes bucket
    /// directly.
    Info,
}

/// Coarse feasibility verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    /// No blocking or warning violations and a high score.
    Green,
    /// Approvable with warnings.
    Yellow,
    /// Not approvable.
    Red,
}

// ============================================================================
// SECTION: Violation
// ============================================================================

/// A single rule's finding against a scored input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule that fired, e.g. `F001`.
    pub rule_id: RuleId,
    /// Severity of this violation.
    pub severity: Severity,
    /// Operator-readable explanation.
    pub message: String,
    /// Machine-readable evidence supporting the message.
    pub evidence: Value,
}

// ============================================================================
// SECTION: Feasibility Verdict
// ============================================================================

/// Deterministic output of the feasibility engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityVerdict {
    /// Coarse bucket.
    pub bucket: Bucket,
    /// Integer score in `[0, 100]`.
    pub score: u8,
    /// Ordered violations, in lexicographic `rule_id` order.
    pub violations: Vec<Violation>,
    /// Deterministic hash of the scored inputs (design spec + context +
    /// engine version).
    pub inputs_fingerprint: String,
    /// Version of the engine that produced this verdict.
    pub engine_version: String,
}

impl FeasibilityVerdict {
    /// Returns `true` if the verdict contains no blocking (HARD) violation.
    #[must_use]
    pub fn is_approvable(&self) -> bool {
        self.bucket != Bucket::Red
    }
}

// ============================================================================
// SECTION: Scored Inputs
// ============================================================================

/// A single item within a design spec's batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignItem {
    /// Caller-supplied part identifier, unique within the batch.
    pub part_id: String,
    /// Material family, e.g. `hardwood`.
    pub material_family: String,
    /// Stock thickness, millimeters.
    pub thickness_mm: f64,
    /// Stock width, millimeters.
    pub width_mm: f64,
    /// Stock length, millimeters.
    pub length_mm: f64,
}

/// The full set of inputs the feasibility engine scores: the design batch,
/// the tool invocation parameters, and the machining context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityInput {
    /// Items in the batch being scored.
    pub items: Vec<DesignItem>,
    /// Operation type, e.g. `slice`.
    pub op_type: String,
    /// Blade or bit identifier, if supplied.
    pub blade_id: Option<String>,
    /// Machine profile identifier, if supplied.
    pub machine_profile: Option<String>,
    /// Batch label of the Run being scored.
    pub batch_label: String,
    /// Session identifier of the Run being scored.
    pub session_id: String,
    /// Machining context in force.
    pub context: MachiningContext,
}

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// A single rule definition: static metadata plus its check function.
struct RuleDef {
    id: &'static str,
    severity: Severity,
    penalty: u8,
    check: fn(&FeasibilityInput) -> Option<(String, Value)>,
}

/// Returns `true` if any numeric field of `values` is non-finite.
fn any_non_finite(values: &[f64]) -> bool {
    values.iter().any(|v| !v.is_finite())
}

#[allow(
    clippy::cast_precision_loss,
    reason = "batch sizes are small enough that u32->f64 is exact for any realistic input"
)]
fn rule_table() -> Vec<RuleDef> {
    vec![
        // --- Core safety rules (F001-F007): HARD, contribute to RED. -------
        RuleDef {
            id: "F001",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .items
                    .iter()
                    .find(|item| item.thickness_mm <= 0.0)
                    .map(|item| {
                        (
                            format!("part {} has non-positive thickness", item.part_id),
                            json!({"part_id": item.part_id, "thickness_mm": item.thickness_mm}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F002",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .items
                    .iter()
                    .find(|item| item.width_mm <= 0.0)
                    .map(|item| {
                        (
                            format!("part {} has non-positive width", item.part_id),
                            json!({"part_id": item.part_id, "width_mm": item.width_mm}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F003",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .items
                    .iter()
                    .find(|item| item.length_mm <= 0.0)
                    .map(|item| {
                        (
                            format!("part {} has non-positive length", item.part_id),
                            json!({"part_id": item.part_id, "length_mm": item.length_mm}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F004",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                let kerf_mm = 3.2;
                input
                    .items
                    .iter()
                    .find(|item| item.thickness_mm < kerf_mm)
                    .map(|item| {
                        (
                            format!(
                                "part {} thickness {}mm is thinner than the blade kerf",
                                item.part_id, item.thickness_mm
                            ),
                            json!({"part_id": item.part_id, "thickness_mm": item.thickness_mm, "kerf_mm": kerf_mm}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F005",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                (input.op_type == "slice" && input.machine_profile.is_none()).then(|| {
                    (
                        "slice operations require a machine profile".to_string(),
                        json!({"op_type": input.op_type}),
                    )
                })
            },
        },
        RuleDef {
            id: "F006",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                const KNOWN_FAMILIES: &[&str] = &["hardwood", "softwood", "plywood", "mdf", "composite"];
                input
                    .items
                    .iter()
                    .find(|item| !KNOWN_FAMILIES.contains(&item.material_family.as_str()))
                    .map(|item| {
                        (
                            format!("unknown material family `{}`", item.material_family),
                            json!({"part_id": item.part_id, "material_family": item.material_family}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F007",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                const MAX_ENVELOPE_MM: f64 = 3000.0;
                input
                    .items
                    .iter()
                    .find(|item| item.length_mm > MAX_ENVELOPE_MM || item.width_mm > MAX_ENVELOPE_MM)
                    .map(|item| {
                        (
                            format!("part {} exceeds the machine envelope", item.part_id),
                            json!({"part_id": item.part_id, "max_envelope_mm": MAX_ENVELOPE_MM}),
                        )
                    })
            },
        },
        // --- Parametric warnings (F010-F013): SOFT, contribute to YELLOW. --
        RuleDef {
            id: "F010",
            severity: Severity::Soft,
            penalty: 15,
            check: |input| {
                let chip_load = input.context.cutting_parameters.feed_mm_min
                    / input.context.cutting_parameters.rpm.max(1.0);
                (chip_load > 0.5).then(|| {
                    (
                        "feed-to-rpm ratio implies an excessive chip load".to_string(),
                        json!({"chip_load": chip_load}),
                    )
                })
            },
        },
        RuleDef {
            id: "F011",
            severity: Severity::Soft,
            penalty: 15,
            check: |input| {
                const MIN_SAFE_RPM: f64 = 1000.0;
                (input.context.cutting_parameters.rpm < MIN_SAFE_RPM).then(|| {
                    (
                        "spindle speed below the minimum safe threshold".to_string(),
                        json!({"rpm": input.context.cutting_parameters.rpm, "min_safe_rpm": MIN_SAFE_RPM}),
                    )
                })
            },
        },
        RuleDef {
            id: "F012",
            severity: Severity::Soft,
            penalty: 10,
            check: |input| {
                let params = input.context.cutting_parameters;
                (params.doc_mm > 0.0 && params.woc_mm / params.doc_mm.max(0.001) > 8.0).then(|| {
                    (
                        "width of cut is large relative to depth of cut, raising deflection risk".to_string(),
                        json!({"woc_mm": params.woc_mm, "doc_mm": params.doc_mm}),
                    )
                })
            },
        },
        RuleDef {
            id: "F013",
            severity: Severity::Soft,
            penalty: 10,
            check: |input| {
                const MAX_SAFE_DOC_MM: f64 = 12.0;
                (input.context.cutting_parameters.doc_mm > MAX_SAFE_DOC_MM).then(|| {
                    (
                        "depth of cut raises heat-related tool wear risk".to_string(),
                        json!({"doc_mm": input.context.cutting_parameters.doc_mm}),
                    )
                })
            },
        },
        // --- Adversarial detectors (F020-F029): HARD, contribute to RED. --
        RuleDef {
            id: "F020",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .items
                    .iter()
                    .find(|item| item.thickness_mm > item.length_mm.max(item.width_mm))
                    .map(|item| {
                        (
                            format!("part {} has contradictory dimensions", item.part_id),
                            json!({"part_id": item.part_id}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F021",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .items
                    .iter()
                    .find(|item| item.width_mm == 0.0 && item.length_mm == 0.0)
                    .map(|item| {
                        (
                            format!("part {} describes zero-radius geometry", item.part_id),
                            json!({"part_id": item.part_id}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F022",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                (input.op_type.is_empty()).then(|| {
                    (
                        "empty operation type suggests an unresolved recursive reference".to_string(),
                        json!({}),
                    )
                })
            },
        },
        RuleDef {
            id: "F023",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                let mut seen = std::collections::BTreeSet::new();
                input
                    .items
                    .iter()
                    .find(|item| !seen.insert(item.part_id.clone()))
                    .map(|item| {
                        (
                            format!("duplicate part_id `{}` within the batch", item.part_id),
                            json!({"part_id": item.part_id}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F024",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .items
                    .iter()
                    .find(|item| item.thickness_mm < 0.0 || item.width_mm < 0.0 || item.length_mm < 0.0)
                    .map(|item| {
                        (
                            format!("part {} has a negative dimension", item.part_id),
                            json!({"part_id": item.part_id}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F025",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                let params = input.context.cutting_parameters;
                any_non_finite(&[params.rpm, params.feed_mm_min, params.doc_mm, params.woc_mm]).then(|| {
                    (
                        "non-finite numeric value in cutting parameters".to_string(),
                        json!({"rpm": params.rpm, "feed_mm_min": params.feed_mm_min}),
                    )
                })
            },
        },
        RuleDef {
            id: "F026",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                const MAX_BATCH_SIZE: usize = 500;
                (input.items.len() > MAX_BATCH_SIZE).then(|| {
                    (
                        format!("batch size {} exceeds the safety cap", input.items.len()),
                        json!({"batch_size": input.items.len(), "max_batch_size": MAX_BATCH_SIZE}),
                    )
                })
            },
        },
        RuleDef {
            id: "F027",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input.blade_id.is_none().then(|| {
                    (
                        "blade or tool identifier is required".to_string(),
                        json!({}),
                    )
                })
            },
        },
        RuleDef {
            id: "F028",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                (!valid(&input.batch_label) || !valid(&input.session_id)).then(|| {
                    (
                        "batch_label or session_id is not a valid identifier".to_string(),
                        json!({"batch_label": input.batch_label, "session_id": input.session_id}),
                    )
                })
            },
        },
        RuleDef {
            id: "F029",
            severity: Severity::Hard,
            penalty: 100,
            check: |input| {
                input
                    .machine_profile
                    .as_deref()
                    .filter(|profile| profile.trim().is_empty())
                    .map(|_| {
                        (
                            "machine profile identifier is blank".to_string(),
                            json!({}),
                        )
                    })
            },
        },
        // --- Edge policies (F030-F041): INFO, score penalty only. ---------
        RuleDef {
            id: "F030",
            severity: Severity::Info,
            penalty: 2,
            check: |input| {
                const TOLERANCE_EDGE_MM: f64 = 1.0;
                input
                    .items
                    .iter()
                    .find(|item| item.thickness_mm < TOLERANCE_EDGE_MM + 3.2)
                    .map(|item| {
                        (
                            format!("part {} thickness is near the tolerance edge", item.part_id),
                            json!({"part_id": item.part_id}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F031",
            severity: Severity::Info,
            penalty: 2,
            check: |input| {
                const ADVISORY_FEED_CEILING: f64 = 2000.0;
                (input.context.cutting_parameters.feed_mm_min > ADVISORY_FEED_CEILING * 0.9).then(|| {
                    (
                        "feed rate is near the advisory upper bound".to_string(),
                        json!({"feed_mm_min": input.context.cutting_parameters.feed_mm_min}),
                    )
                })
            },
        },
        RuleDef {
            id: "F032",
            severity: Severity::Info,
            penalty: 2,
            check: |input| {
                const ADVISORY_RPM_CEILING: f64 = 6000.0;
                (input.context.cutting_parameters.rpm > ADVISORY_RPM_CEILING * 0.9).then(|| {
                    (
                        "spindle speed is near the advisory upper bound".to_string(),
                        json!({"rpm": input.context.cutting_parameters.rpm}),
                    )
                })
            },
        },
        RuleDef {
            id: "F033",
            severity: Severity::Info,
            penalty: 2,
            check: |input| {
                const RECOMMENDED_MAX_DOC_MM: f64 = 12.0;
                (input.context.cutting_parameters.doc_mm > RECOMMENDED_MAX_DOC_MM * 0.8).then(|| {
                    (
                        "depth of cut is near the recommended maximum".to_string(),
                        json!({"doc_mm": input.context.cutting_parameters.doc_mm}),
                    )
                })
            },
        },
        RuleDef {
            id: "F034",
            severity: Severity::Info,
            penalty: 2,
            check: |input| {
                const RECOMMENDED_MAX_WOC_MM: f64 = 50.0;
                (input.context.cutting_parameters.woc_mm > RECOMMENDED_MAX_WOC_MM * 0.8).then(|| {
                    (
                        "width of cut is near the recommended maximum".to_string(),
                        json!({"woc_mm": input.context.cutting_parameters.woc_mm}),
                    )
                })
            },
        },
        RuleDef {
            id: "F035",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                input
                    .context
                    .feature_flags
                    .get("moisture_content_specified")
                    .is_none_or(|specified| !specified)
                    .then(|| {
                        (
                            "material moisture content was not specified".to_string(),
                            json!({}),
                        )
                    })
            },
        },
        RuleDef {
            id: "F036",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                input
                    .context
                    .project_id
                    .is_none()
                    .then(|| ("project_id was not supplied".to_string(), json!({})))
            },
        },
        RuleDef {
            id: "F037",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                input
                    .context
                    .machine_profile_id
                    .is_none()
                    .then(|| ("machine_profile_id was not supplied".to_string(), json!({})))
            },
        },
        RuleDef {
            id: "F038",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                input
                    .context
                    .feature_flags
                    .get("deprecated_usage")
                    .copied()
                    .unwrap_or(false)
                    .then(|| ("a deprecated feature flag is set".to_string(), json!({})))
            },
        },
        RuleDef {
            id: "F039",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                const MAX_ADVISORY_LABEL_LEN: usize = 64;
                (input.batch_label.len() as f64 > MAX_ADVISORY_LABEL_LEN as f64 * 0.9).then(|| {
                    (
                        "batch_label length is near the advisory maximum".to_string(),
                        json!({"len": input.batch_label.len()}),
                    )
                })
            },
        },
        RuleDef {
            id: "F040",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                const COMMON_OPS: &[&str] = &["slice", "rip", "crosscut", "resaw"];
                (!COMMON_OPS.contains(&input.op_type.as_str())).then(|| {
                    (
                        format!("operation type `{}` is uncommon for this lane", input.op_type),
                        json!({"op_type": input.op_type}),
                    )
                })
            },
        },
        RuleDef {
            id: "F041",
            severity: Severity::Info,
            penalty: 1,
            check: |input| {
                (input.items.len() <= 1).then(|| {
                    (
                        "batch contains a single part; setup overhead may dominate".to_string(),
                        json!({"batch_size": input.items.len()}),
                    )
                })
            },
        },
    ]
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Errors raised while evaluating feasibility.
#[derive(Debug, thiserror::Error)]
pub enum FeasibilityError {
    /// The inputs could not be canonicalized for fingerprinting.
    #[error(transparent)]
    Hashing(#[from] HashError),
}

/// Deterministic, versioned feasibility engine.
#[derive(Debug, Clone)]
pub struct FeasibilityEngine {
    engine_version: String,
}

impl FeasibilityEngine {
    /// Creates a new engine stamped with the given version.
    ///
    /// Changing a rule's logic must bump `engine_version`; drift detection
    /// relies on this stamp matching between PLAN and EXECUTION.
    #[must_use]
    pub fn new(engine_version: impl Into<String>) -> Self {
        Self {
            engine_version: engine_version.into(),
        }
    }

    /// Evaluates the full rule set against `input` and returns the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`FeasibilityError::Hashing`] if the inputs fingerprint cannot
    /// be computed.
    pub fn evaluate(&self, input: &FeasibilityInput) -> Result<FeasibilityVerdict, FeasibilityError> {
        let mut rules = rule_table();
        rules.sort_by(|a, b| a.id.cmp(b.id));

        let mut violations = Vec::new();
        let mut score: i32 = 100;
        for rule in &rules {
            if let Some((message, evidence)) = (rule.check)(input) {
                score -= i32::from(rule.penalty);
                violations.push(Violation {
                    rule_id: RuleId::new(rule.id),
                    severity: rule.severity,
                    message,
                    evidence,
                });
            }
        }
        let score = score.clamp(0, 100);
        #[allow(
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation,
            reason = "score is clamped to [0, 100] immediately above"
        )]
        let score = score as u8;

        let has_hard = violations.iter().any(|v| v.severity == Severity::Hard);
        let has_soft = violations.iter().any(|v| v.severity == Severity::Soft);
        let bucket = if has_hard {
            Bucket::Red
        } else if score >= 85 && !has_soft {
            Bucket::Green
        } else if score >= 60 {
            Bucket::Yellow
        } else {
            Bucket::Red
        };

        let fingerprint_source = json!({
            "items": input.items,
            "op_type": input.op_type,
            "blade_id": input.blade_id,
            "machine_profile": input.machine_profile,
            "context": input.context,
            "engine_version": self.engine_version,
        });
        let digest = hash_canonical_json(HashAlgorithm::Sha256, &fingerprint_source)?;

        Ok(FeasibilityVerdict {
            bucket,
            score,
            violations,
            inputs_fingerprint: digest.value,
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

    use super::*;
    use std::collections::BTreeMap;

    use crate::core::identifiers::MachineProfileId;
    use crate::core::identifiers::MaterialId;
    use crate::core::identifiers::OperationKind;
    use crate::core::identifiers::ToolId;

    fn happy_path_input() -> FeasibilityInput {
        FeasibilityInput {
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
            batch_label: "b1".to_string(),
            session_id: "s1".to_string(),
            context: MachiningContext {
                material_id: MaterialId::new("hardwood"),
                tool_id: ToolId::new("BLADE_10IN_60T"),
                machine_profile_id: Some(MachineProfileId::new("SAW_LAB_01")),
                project_id: None,
                operation_kind: OperationKind::new("slice"),
                cutting_parameters: super::super::context::CuttingParameters {
                    rpm: 3600.0,
                    feed_mm_min: 1200.0,
                    doc_mm: 3.0,
                    woc_mm: 6.0,
                },
                feature_flags: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn happy_path_is_green_or_yellow() {
        let engine = FeasibilityEngine::new("1.0.0");
        let verdict = engine.evaluate(&happy_path_input()).expect("evaluate");
        assert!(matches!(verdict.bucket, Bucket::Green | Bucket::Yellow));
    }

    #[test]
    fn zero_thickness_triggers_f001_and_forces_red() {
        let mut input = happy_path_input();
        input.items[0].thickness_mm = 0.0;
        let engine = FeasibilityEngine::new("1.0.0");
        let verdict = engine.evaluate(&input).expect("evaluate");
        assert_eq!(verdict.bucket, Bucket::Red);
        assert!(verdict.violations.iter().any(|v| v.rule_id.as_str() == "F001"));
    }

    #[test]
    fn violations_are_sorted_by_rule_id() {
        let mut input = happy_path_input();
        input.items[0].thickness_mm = 0.0;
        input.items[0].width_mm = 0.0;
        let engine = FeasibilityEngine::new("1.0.0");
        let verdict = engine.evaluate(&input).expect("evaluate");
        let ids: Vec<&str> = verdict.violations.iter().map(|v| v.rule_id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn fingerprint_is_stable_for_identical_inputs() {
        let engine = FeasibilityEngine::new("1.0.0");
        let a = engine.evaluate(&happy_path_input()).expect("evaluate a");
        let b = engine.evaluate(&happy_path_input()).expect("evaluate b");
        assert_eq!(a.inputs_fingerprint, b.inputs_fingerprint);
    }

    #[test]
    fn fingerprint_changes_when_context_drifts() {
        let engine = FeasibilityEngine::new("1.0.0");
        let a = engine.evaluate(&happy_path_input()).expect("evaluate a");
        let mut drifted = happy_path_input();
        drifted.context.tool_id = ToolId::new("BLADE_8IN_40T");
        let b = engine.evaluate(&drifted).expect("evaluate b");
        assert_ne!(a.inputs_fingerprint, b.inputs_fingerprint);
    }
}
