//! Rule-Based Overtaking Policy
//!
//! Deterministic finite-state baseline for highway overtaking.
//!
//! # Behavior
//!
//! Rules are tried in order each step; the first that returns an action wins:
//!
//! 1. A slow vehicle ahead in the same lane, within the trigger distance:
//!    change left if the left lane is safe and the cooldown has expired,
//!    otherwise slow down if it is inside the safe distance
//! 2. Left of the reference lane: return right when safe and cooled down
//! 3. Below target speed: accelerate
//! 4. Otherwise keep lane
//!
//! Rule 1 only returns when it acts; a slow front vehicle that is neither
//! passable nor too close falls through to rules 2 to 4.
//!
//! # Cooldown
//!
//! A lane change arms a cooldown of `cooldown_steps`; it is decremented once
//! at the start of every step, before the rules run.

use tracing::{debug, warn};

use super::DecisionSource;
use crate::config::EvaluationConfig;
use crate::models::{
    DecisionAction, LaneClass, Observation, RelativeQuery, SafetyEnvelope, LANE_TOLERANCE,
};

/// Rule-based overtaking baseline
///
/// # Example
///
/// ```
/// use highway_overtake_core_rs::policy::{DecisionSource, RuleBasedPolicy};
/// use highway_overtake_core_rs::{DecisionAction, EvaluationConfig};
///
/// let mut policy = RuleBasedPolicy::new(&EvaluationConfig::default());
/// let obs = vec![
///     vec![1.0, 0.0, 0.0, 20.0, 0.0],  // ego at 20
///     vec![1.0, 30.0, 0.0, 15.0, 0.0], // slow car 30 ahead
/// ];
/// assert_eq!(policy.propose(&obs), DecisionAction::LaneLeft);
/// assert_eq!(policy.cooldown(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct RuleBasedPolicy {
    envelope: SafetyEnvelope,
    slow_vehicle_threshold: f64,
    target_speed: f64,
    overtake_trigger_distance: f64,
    cooldown_steps: u32,
    cooldown: u32,
}

impl RuleBasedPolicy {
    /// Create a policy from the evaluation configuration
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            envelope: config.envelope(),
            slow_vehicle_threshold: config.overtaking_success.reference_speed_threshold,
            target_speed: config.speed.ego_target,
            overtake_trigger_distance: config.policy.overtake_trigger_distance,
            cooldown_steps: config.policy.cooldown_steps,
            cooldown: 0,
        }
    }

    /// Steps remaining before another lane change may be proposed
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn envelope(&self) -> &SafetyEnvelope {
        &self.envelope
    }

    /// Run the decision rules against a parsed observation
    pub fn decide(&mut self, observation: &Observation) -> DecisionAction {
        self.cooldown = self.cooldown.saturating_sub(1);

        let Some(ego) = observation.ego() else {
            return DecisionAction::Idle;
        };

        // 1. Slow vehicle ahead: try to overtake on the left
        if let Some(front) = observation.find(RelativeQuery::front(LaneClass::Same)) {
            let front_distance = front.long_offset;
            if front.vx < self.slow_vehicle_threshold && front_distance < self.overtake_trigger_distance {
                if self.lane_is_safe(observation, LaneClass::Left) && self.cooldown == 0 {
                    return self.change_lane(DecisionAction::LaneLeft);
                }

                if front_distance < self.envelope.min_safe_distance {
                    debug!(front_distance, "left lane blocked, following slow vehicle");
                    return DecisionAction::Slower;
                }
            }
        }

        // 2. Return to the right once the lane there is clear
        if ego.lat_offset > LANE_TOLERANCE
            && self.lane_is_safe(observation, LaneClass::Right)
            && self.cooldown == 0
        {
            return self.change_lane(DecisionAction::LaneRight);
        }

        // 3. Accelerate to target speed
        if ego.vx < self.target_speed {
            return DecisionAction::Faster;
        }

        // 4. Keep lane
        DecisionAction::Idle
    }

    fn lane_is_safe(&self, observation: &Observation, lane: LaneClass) -> bool {
        let assessment = self.envelope.assess_lane(observation, lane);
        let safe = assessment.is_some_and(|a| a.is_safe());
        if !safe {
            debug!(?lane, ?assessment, "lane change rejected");
        }
        safe
    }

    fn change_lane(&mut self, action: DecisionAction) -> DecisionAction {
        self.cooldown = self.cooldown_steps;
        debug!(%action, cooldown = self.cooldown, "lane change proposed");
        action
    }
}

impl DecisionSource for RuleBasedPolicy {
    fn propose(&mut self, observation: &[Vec<f64>]) -> DecisionAction {
        match Observation::parse(observation) {
            Ok(parsed) => self.decide(&parsed),
            Err(err) => {
                // Cooldown still ticks so a run of bad frames cannot freeze it
                self.cooldown = self.cooldown.saturating_sub(1);
                warn!(error = %err, "malformed observation, holding lane");
                DecisionAction::Idle
            }
        }
    }

    fn reset(&mut self) {
        self.cooldown = 0;
    }

    fn name(&self) -> &str {
        "baseline"
    }
}
