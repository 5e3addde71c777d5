// rmos-core/src/core/feedback.rs
// ============================================================================
// Module: RMOS Feedback Loop Types
// Description: Job-log metrics, learning events, and persisted overrides.
// Purpose: Model the job logs -> learning events -> accept/reject gate ->
//          conditional parameter overrides pipeline.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The feedback loop is observational by default. All three governing flags
//! (`LEARNING_HOOK_ENABLED`, `METRICS_ROLLUP_HOOK_ENABLED`,
//! `APPLY_ACCEPTED_OVERRIDES`) default to OFF; this module only defines the
//! data shapes the loop produces, not the gating itself (see
//! `rmos_config::FeedbackConfig` for the flags and
//! `runtime::orchestrator` for where they are consulted).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use super::identifiers::MachineProfileId;
use super::identifiers::MaterialId;
use super::identifiers::OperationKind;
use super::identifiers::PrincipalId;
use super::identifiers::ToolId;

// ============================================================================
// SECTION: Job Log Metrics
// ============================================================================

/// Operator-observable metrics attached to a JOB_LOG artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    /// Setup time, seconds.
    pub setup_seconds: f64,
    /// Cut time, seconds.
    pub cut_seconds: f64,
    /// Total elapsed time, seconds.
    pub total_seconds: f64,
    /// Count of parts that finished OK.
    pub ok_count: u32,
    /// Count of parts scrapped.
    pub scrap_count: u32,
    /// Burn events observed.
    pub burn_events: u32,
    /// Tearout events observed.
    pub tearout_events: u32,
    /// Kickback events observed.
    pub kickback_events: u32,
    /// Chatter events observed.
    pub chatter_events: u32,
    /// Tool-wear events observed.
    pub tool_wear_events: u32,
}

impl JobMetrics {
    /// Yield rate as OK / (OK + scrap), or `0.0` when no parts were produced.
    #[must_use]
    pub fn yield_rate(&self) -> f64 {
        let total = f64::from(self.ok_count + self.scrap_count);
        if total == 0.0 {
            0.0
        } else {
            f64::from(self.ok_count) / total
        }
    }
}

// ============================================================================
// SECTION: Learning Multipliers
// ============================================================================

/// Parameter multipliers a [`LearningEvent`] proposes and a
/// [`LearningOverride`] persists once accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningMultipliers {
    /// Spindle-speed multiplier.
    pub rpm: f64,
    /// Feed-rate multiplier.
    pub feed: f64,
    /// Depth-of-cut multiplier.
    pub doc: f64,
    /// Width-of-cut multiplier.
    pub woc: f64,
}

impl Default for LearningMultipliers {
    fn default() -> Self {
        Self {
            rpm: 1.0,
            feed: 1.0,
            doc: 1.0,
            woc: 1.0,
        }
    }
}


// ============================================================================
// SECTION: Learning Event
// ============================================================================

/// A candidate parameter-adjustment observation derived from job metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    /// Proposed multipliers.
    pub proposed_multipliers: LearningMultipliers,
    /// Confidence weight in `[0.0, 1.0]`, derived from signal strength.
    pub confidence: f64,
    /// Human-readable quality signals that drove the proposal, e.g.
    /// `"burn_events_elevated"`.
    pub signals: Vec<String>,
}

impl LearningEvent {
    /// Derives a candidate parameter adjustment from a single job's metrics.
    ///
    /// Each elevated event type nudges the corresponding cutting parameter
    /// down by a fixed step and contributes one signal and one confidence
    /// unit; confidence is the fraction of tracked signal types that fired,
    /// capped at `1.0`. A job with no elevated events proposes the neutral
    /// multiplier set at zero confidence.
    #[must_use]
    pub fn derive_from_metrics(metrics: &JobMetrics) -> Self {
        let mut multipliers = LearningMultipliers::default();
        let mut signals = Vec::new();

        if metrics.burn_events > 0 {
            multipliers.feed -= 0.1;
            signals.push("burn_events_elevated".to_string());
        }
        if metrics.tearout_events > 0 {
            multipliers.doc -= 0.1;
            signals.push("tearout_events_elevated".to_string());
        }
        if metrics.chatter_events > 0 {
            multipliers.rpm -= 0.05;
            signals.push("chatter_events_elevated".to_string());
        }
        if metrics.kickback_events > 0 {
            multipliers.woc -= 0.1;
            signals.push("kickback_events_elevated".to_string());
        }
        if metrics.tool_wear_events > 0 {
            multipliers.feed -= 0.05;
            signals.push("tool_wear_events_elevated".to_string());
        }

        #[allow(clippy::cast_precision_loss, reason = "signal count is bounded to 5")]
        let confidence = (signals.len() as f64 / 5.0).min(1.0);
        Self {
            proposed_multipliers: multipliers,
            confidence,
            signals,
        }
    }
}

// ============================================================================
// SECTION: Learning Decision
// ============================================================================

/// Disposition of a [`LearningEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearningDecisionOutcome {
    /// The event's multipliers were accepted and persisted as an override.
    Accepted,
    /// The event was rejected; no override is persisted.
    Rejected,
}

/// The operator's (or governance policy's) disposition of a learning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningDecision {
    /// Accept or reject.
    pub outcome: LearningDecisionOutcome,
    /// Operator or policy identifier recording the disposition.
    pub decided_by: PrincipalId,
    /// Free-text rationale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// SECTION: Learning Override
// ============================================================================

/// A persisted parameter multiplier keyed by the four-dimensional override
/// tuple, consulted only when `APPLY_ACCEPTED_OVERRIDES` is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningOverride {
    /// Tool dimension of the override key.
    pub tool_id: ToolId,
    /// Material dimension of the override key.
    pub material_id: MaterialId,
    /// Operation-kind dimension of the override key.
    pub operation_kind: OperationKind,
    /// Optional machine-profile dimension of the override key.
    pub machine_profile_id: Option<MachineProfileId>,
    /// The accepted multipliers.
    pub multipliers: LearningMultipliers,
    /// Operator who accepted the originating learning event.
    pub accepted_by: PrincipalId,
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;

    #[test]
    fn yield_rate_handles_zero_parts() {
        let metrics = JobMetrics::default();
        assert_eq!(metrics.yield_rate(), 0.0);
    }

    #[test]
    fn yield_rate_computes_ok_over_total() {
        let metrics = JobMetrics {
            ok_count: 9,
            scrap_count: 1,
            ..JobMetrics::default()
        };
        assert!((metrics.yield_rate() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn default_multipliers_are_neutral() {
        let multipliers = LearningMultipliers::default();
        assert_eq!(multipliers.rpm, 1.0);
        assert_eq!(multipliers.feed, 1.0);
        assert_eq!(multipliers.doc, 1.0);
        assert_eq!(multipliers.woc, 1.0);
    }

    #[test]
    fn clean_job_proposes_neutral_multipliers_at_zero_confidence() {
        let event = LearningEvent::derive_from_metrics(&JobMetrics::default());
        assert_eq!(event.proposed_multipliers, LearningMultipliers::default());
        assert_eq!(event.confidence, 0.0);
        assert!(event.signals.is_empty());
    }

    #[test]
    fn burn_events_propose_a_reduced_feed_rate() {
        let metrics = JobMetrics {
            burn_events: 2,
            ..JobMetrics::default()
        };
        let event = LearningEvent::derive_from_metrics(&metrics);
        assert!((event.proposed_multipliers.feed - 0.9).abs() < f64::EPSILON);
        assert_eq!(event.signals, vec!["burn_events_elevated".to_string()]);
        assert!((event.confidence - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_caps_at_one_when_every_signal_fires() {
        let metrics = JobMetrics {
            burn_events: 1,
            tearout_events: 1,
            chatter_events: 1,
            kickback_events: 1,
            tool_wear_events: 1,
            ..JobMetrics::default()
        };
        let event = LearningEvent::derive_from_metrics(&metrics);
        assert_eq!(event.signals.len(), 5);
        assert!((event.confidence - 1.0).abs() < f64::EPSILON);
    }
}
