//! Reward shaping
//!
//! Combines the environment's raw reward terms with safety penalties and the
//! one-time overtaking bonus.

use serde::{Deserialize, Serialize};

use crate::config::{EvaluationConfig, RewardWeights};
use crate::models::RoadSnapshot;

/// Raw per-step reward terms reported by the environment
///
/// Missing terms count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardBreakdown {
    pub high_speed_reward: Option<f64>,
    pub right_lane_reward: Option<f64>,
    pub on_road_reward: Option<f64>,
}

/// Raw feedback from one environment step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepFeedback {
    pub rewards: RewardBreakdown,
    pub crashed: bool,
}

/// Weighted reward terms for one step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardComponents {
    pub collision: f64,
    pub high_speed: f64,
    pub right_lane: f64,
    pub on_road: f64,
    pub dangerous_distance: f64,
    pub overtaking_success: f64,
}

impl RewardComponents {
    pub fn total(&self) -> f64 {
        self.collision
            + self.high_speed
            + self.right_lane
            + self.on_road
            + self.dangerous_distance
            + self.overtaking_success
    }
}

/// Stateless reward calculator
#[derive(Debug, Clone, PartialEq)]
pub struct RewardShaper {
    weights: RewardWeights,
    min_safe_distance: f64,
}

impl RewardShaper {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            weights: config.reward_weights.clone(),
            min_safe_distance: config.safety.min_safe_distance,
        }
    }

    /// Any other vehicle strictly inside the safe distance (Euclidean)
    pub fn is_dangerous(&self, road: &RoadSnapshot) -> bool {
        road.others
            .iter()
            .any(|v| v.distance_to(&road.ego) < self.min_safe_distance)
    }

    /// Weighted components for one step
    ///
    /// `award_bonus` is true only on the step the overtake completes.
    pub fn components(
        &self,
        feedback: &StepFeedback,
        dangerous: bool,
        award_bonus: bool,
    ) -> RewardComponents {
        let w = &self.weights;
        let raw = &feedback.rewards;
        RewardComponents {
            collision: if feedback.crashed { w.collision } else { 0.0 },
            high_speed: raw.high_speed_reward.unwrap_or(0.0) * w.high_speed_reward,
            right_lane: raw.right_lane_reward.unwrap_or(0.0) * w.right_lane_reward,
            on_road: raw.on_road_reward.unwrap_or(0.0) * w.on_road_reward,
            dangerous_distance: if dangerous { w.dangerous_distance } else { 0.0 },
            overtaking_success: if award_bonus { w.overtaking_success } else { 0.0 },
        }
    }
}
