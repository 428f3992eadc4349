//! Safety Shield
//!
//! Policy-agnostic action filter. Every proposed action, whatever produced
//! it, is re-checked against the observation and overridden to `IDLE` when it
//! would break the safety envelope.
//!
//! # Checks
//!
//! - `LANE_LEFT` / `LANE_RIGHT`: the lane-change envelope against the target
//!   lane's nearest front and rear vehicles
//! - `FASTER`: a same-lane front vehicle within
//!   `faster_margin × min_safe_distance` (wider than the policy's own gap)
//! - anything else passes through
//!
//! A malformed observation (or an action index outside the vocabulary)
//! fails closed to `IDLE`. That override counts toward `total_interventions`
//! and the separate `fail_closed` counter, never toward a specific reason.
//!
//! # Independence
//!
//! The shield parses the raw observation itself and holds its own copy of
//! the envelope; it shares no state with any decision source.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EvaluationConfig;
use crate::models::{
    DecisionAction, LaneClass, Observation, RelativeQuery, SafetyEnvelope,
};

mod shielded;

pub use shielded::ShieldedPolicy;

/// Why the shield overrode an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionReason {
    UnsafeLaneChangeLeft,
    UnsafeLaneChangeRight,
    TooCloseFront,
}

impl InterventionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InterventionReason::UnsafeLaneChangeLeft => "unsafe_lane_change_left",
            InterventionReason::UnsafeLaneChangeRight => "unsafe_lane_change_right",
            InterventionReason::TooCloseFront => "too_close_front",
        }
    }
}

/// Running count per intervention reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterventionCounts {
    pub unsafe_lane_change_left: u64,
    pub unsafe_lane_change_right: u64,
    pub too_close_front: u64,
}

impl InterventionCounts {
    pub fn get(&self, reason: InterventionReason) -> u64 {
        match reason {
            InterventionReason::UnsafeLaneChangeLeft => self.unsafe_lane_change_left,
            InterventionReason::UnsafeLaneChangeRight => self.unsafe_lane_change_right,
            InterventionReason::TooCloseFront => self.too_close_front,
        }
    }

    fn increment(&mut self, reason: InterventionReason) {
        match reason {
            InterventionReason::UnsafeLaneChangeLeft => self.unsafe_lane_change_left += 1,
            InterventionReason::UnsafeLaneChangeRight => self.unsafe_lane_change_right += 1,
            InterventionReason::TooCloseFront => self.too_close_front += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.unsafe_lane_change_left + self.unsafe_lane_change_right + self.too_close_front
    }
}

/// Snapshot of the shield's counters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShieldStatistics {
    pub total_checks: u64,
    pub total_interventions: u64,
    /// Percentage of checks that were overridden
    pub intervention_rate: f64,
    pub intervention_reasons: InterventionCounts,
    /// Overrides caused by unparseable input
    pub fail_closed: u64,
}

/// `100 × interventions / checks`, or 0 with no checks
pub fn intervention_rate(interventions: u64, checks: u64) -> f64 {
    if checks == 0 {
        0.0
    } else {
        interventions as f64 / checks as f64 * 100.0
    }
}

/// Result of one shield check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldOutcome {
    /// Action to apply to the environment
    pub action: DecisionAction,
    /// Whether the proposed action was overridden
    pub corrected: bool,
    /// Specific reason, `None` for pass-through and fail-closed overrides
    pub reason: Option<InterventionReason>,
}

impl ShieldOutcome {
    fn pass(action: DecisionAction) -> Self {
        Self {
            action,
            corrected: false,
            reason: None,
        }
    }
}

/// Safety shield with intervention bookkeeping
///
/// # Example
///
/// ```
/// use highway_overtake_core_rs::shield::{InterventionReason, SafetyShield};
/// use highway_overtake_core_rs::{DecisionAction, EvaluationConfig};
///
/// let mut shield = SafetyShield::new(&EvaluationConfig::default());
/// let obs = vec![
///     vec![1.0, 0.0, 0.0, 20.0, 0.0],
///     vec![1.0, 10.0, 4.0, 20.0, 0.0], // left lane, 10 ahead
/// ];
/// let (action, corrected) = shield.check_and_correct(&obs, DecisionAction::LaneLeft);
/// assert_eq!((action, corrected), (DecisionAction::Idle, true));
/// assert_eq!(shield.statistics().intervention_reasons.get(InterventionReason::UnsafeLaneChangeLeft), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SafetyShield {
    envelope: SafetyEnvelope,
    faster_margin: f64,
    total_checks: u64,
    total_interventions: u64,
    reasons: InterventionCounts,
    fail_closed: u64,
}

impl SafetyShield {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self::with_envelope(config.envelope(), config.shield.faster_margin)
    }

    pub fn with_envelope(envelope: SafetyEnvelope, faster_margin: f64) -> Self {
        Self {
            envelope,
            faster_margin,
            total_checks: 0,
            total_interventions: 0,
            reasons: InterventionCounts::default(),
            fail_closed: 0,
        }
    }

    pub fn envelope(&self) -> &SafetyEnvelope {
        &self.envelope
    }

    /// Validate an action, returning `(action_to_apply, was_corrected)`
    pub fn check_and_correct(
        &mut self,
        observation: &[Vec<f64>],
        action: DecisionAction,
    ) -> (DecisionAction, bool) {
        let outcome = self.evaluate(observation, action);
        (outcome.action, outcome.corrected)
    }

    /// Validate an integer-encoded action
    ///
    /// Indices outside the action vocabulary fail closed.
    pub fn check_and_correct_index(
        &mut self,
        observation: &[Vec<f64>],
        action: i64,
    ) -> (DecisionAction, bool) {
        match DecisionAction::try_from(action) {
            Ok(action) => self.check_and_correct(observation, action),
            Err(err) => {
                self.total_checks += 1;
                let outcome = self.override_unparseable(&err);
                (outcome.action, outcome.corrected)
            }
        }
    }

    /// Validate an action and report why it was overridden, if it was
    pub fn evaluate(&mut self, observation: &[Vec<f64>], action: DecisionAction) -> ShieldOutcome {
        self.total_checks += 1;

        let parsed = match Observation::parse(observation) {
            Ok(parsed) => parsed,
            Err(err) => return self.override_unparseable(&err),
        };
        if parsed.ego().is_none() {
            return self.override_unparseable(&"observation without ego");
        }

        let envelope = self.envelope;
        let lane_blocked = |lane| !envelope.assess_lane(&parsed, lane).is_some_and(|a| a.is_safe());
        let violation = match action {
            DecisionAction::LaneLeft => lane_blocked(LaneClass::Left)
                .then_some(InterventionReason::UnsafeLaneChangeLeft),
            DecisionAction::LaneRight => lane_blocked(LaneClass::Right)
                .then_some(InterventionReason::UnsafeLaneChangeRight),
            DecisionAction::Faster => {
                let margin = self.envelope.min_safe_distance * self.faster_margin;
                parsed
                    .find(RelativeQuery::front(LaneClass::Same))
                    .filter(|front| front.long_offset < margin)
                    .map(|_| InterventionReason::TooCloseFront)
            }
            DecisionAction::Idle | DecisionAction::Slower => None,
        };

        match violation {
            Some(reason) => {
                self.total_interventions += 1;
                self.reasons.increment(reason);
                debug!(proposed = %action, reason = reason.as_str(), "shield override");
                ShieldOutcome {
                    action: DecisionAction::Idle,
                    corrected: true,
                    reason: Some(reason),
                }
            }
            None => ShieldOutcome::pass(action),
        }
    }

    fn override_unparseable(&mut self, cause: &dyn std::fmt::Display) -> ShieldOutcome {
        self.total_interventions += 1;
        self.fail_closed += 1;
        warn!(cause = %cause, "shield failing closed to IDLE");
        ShieldOutcome {
            action: DecisionAction::Idle,
            corrected: true,
            reason: None,
        }
    }

    /// Current counters
    pub fn statistics(&self) -> ShieldStatistics {
        ShieldStatistics {
            total_checks: self.total_checks,
            total_interventions: self.total_interventions,
            intervention_rate: intervention_rate(self.total_interventions, self.total_checks),
            intervention_reasons: self.reasons,
            fail_closed: self.fail_closed,
        }
    }

    /// Zero every counter (between evaluation runs)
    pub fn reset(&mut self) {
        self.total_checks = 0;
        self.total_interventions = 0;
        self.reasons = InterventionCounts::default();
        self.fail_closed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shield() -> SafetyShield {
        SafetyShield::new(&EvaluationConfig::default())
    }

    #[test]
    fn test_faster_blocked_inside_wide_margin() {
        let mut shield = shield();
        // 20 ahead: outside the policy's 15 but inside the shield's 22.5
        let obs = vec![vec![1.0, 0.0, 0.0, 25.0, 0.0], vec![1.0, 20.0, 0.0, 25.0, 0.0]];
        let outcome = shield.evaluate(&obs, DecisionAction::Faster);
        assert_eq!(outcome.action, DecisionAction::Idle);
        assert_eq!(outcome.reason, Some(InterventionReason::TooCloseFront));

        let obs = vec![vec![1.0, 0.0, 0.0, 25.0, 0.0], vec![1.0, 22.5, 0.0, 25.0, 0.0]];
        assert_eq!(
            shield.check_and_correct(&obs, DecisionAction::Faster),
            (DecisionAction::Faster, false)
        );
    }

    #[test]
    fn test_slower_and_idle_always_pass() {
        let mut shield = shield();
        let obs = vec![vec![1.0, 0.0, 0.0, 25.0, 0.0], vec![1.0, 1.0, 0.0, 5.0, 0.0]];
        assert_eq!(
            shield.check_and_correct(&obs, DecisionAction::Slower),
            (DecisionAction::Slower, false)
        );
        assert_eq!(
            shield.check_and_correct(&obs, DecisionAction::Idle),
            (DecisionAction::Idle, false)
        );
        assert_eq!(shield.statistics().total_checks, 2);
        assert_eq!(shield.statistics().total_interventions, 0);
    }

    #[test]
    fn test_fail_closed_counts_as_intervention_without_reason() {
        let mut shield = shield();
        let outcome = shield.evaluate(&[vec![1.0, 2.0]], DecisionAction::Faster);
        assert_eq!(outcome.action, DecisionAction::Idle);
        assert!(outcome.corrected);
        assert_eq!(outcome.reason, None);

        let stats = shield.statistics();
        assert_eq!(stats.total_checks, 1);
        assert_eq!(stats.total_interventions, 1);
        assert_eq!(stats.fail_closed, 1);
        assert_eq!(stats.intervention_reasons.total(), 0);
    }

    #[test]
    fn test_out_of_range_index_fails_closed() {
        let mut shield = shield();
        let obs = vec![vec![1.0, 0.0, 0.0, 25.0, 0.0]];
        assert_eq!(shield.check_and_correct_index(&obs, 9), (DecisionAction::Idle, true));
        assert_eq!(shield.check_and_correct_index(&obs, 4), (DecisionAction::Slower, false));
        assert_eq!(shield.statistics().fail_closed, 1);
        assert_eq!(shield.statistics().total_checks, 2);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let mut shield = shield();
        shield.check_and_correct(&[], DecisionAction::LaneLeft);
        shield.reset();
        let stats = shield.statistics();
        assert_eq!(stats.total_checks, 0);
        assert_eq!(stats.total_interventions, 0);
        assert_eq!(stats.fail_closed, 0);
        assert_eq!(stats.intervention_rate, 0.0);
    }
}
