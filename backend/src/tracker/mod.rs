//! Episode Outcome Tracker
//!
//! Follows one episode step by step: shapes the reward, counts
//! dangerous-distance violations and decides whether the ego completed an
//! overtake of the designated slow target vehicle.
//!
//! # Overtaking state machine
//!
//! At episode start the nearest vehicle ahead of the ego that is slower than
//! `reference_speed_threshold` becomes the target. The target is held as a
//! [`VehicleId`] and re-resolved in every step's [`RoadSnapshot`].
//!
//! ```text
//!            ego.x > target.x              steps_ahead >= maintain_steps
//!   behind ───────────────────▶ ahead(n) ─────────────────────────────▶ complete
//!     ▲                            │
//!     └────── ego.x <= target.x ───┘ (steps_ahead := 0)
//! ```
//!
//! `complete` is terminal for the episode. Without a target it is never
//! reached.
//!
//! # Bonus timing
//!
//! The overtaking status is updated before the reward is shaped, so the
//! one-time bonus lands on the very step that completes the overtake.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EvaluationConfig;
use crate::models::{EpisodeOutcome, Observation, RoadSnapshot, VehicleId};

pub mod reward;

pub use reward::{RewardBreakdown, RewardComponents, RewardShaper, StepFeedback};

/// Augmented per-step information
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Shaped reward for this step
    pub reward: f64,
    pub reward_components: RewardComponents,
    /// Another vehicle was inside the safe distance
    pub violation: bool,
    pub crashed: bool,
    pub overtaking_complete: bool,
    pub episode_length: usize,
    pub violation_count: usize,
}

/// Pick the overtaking target: nearest slower vehicle ahead of the ego
///
/// Ties go to the vehicle listed first.
pub fn select_target(road: &RoadSnapshot, speed_threshold: f64) -> Option<VehicleId> {
    let ego_x = road.ego.position[0];
    road.others
        .iter()
        .filter(|v| v.position[0] > ego_x && v.velocity[0] < speed_threshold)
        .min_by(|a, b| a.position[0].total_cmp(&b.position[0]))
        .map(|v| v.id)
}

/// Per-episode outcome tracker and reward shaper
///
/// # Example
/// ```
/// use highway_overtake_core_rs::models::{RoadSnapshot, VehicleSnapshot};
/// use highway_overtake_core_rs::tracker::{OutcomeTracker, StepFeedback};
/// use highway_overtake_core_rs::EvaluationConfig;
///
/// let mut config = EvaluationConfig::default();
/// config.overtaking_success.maintain_steps = 2;
/// let mut tracker = OutcomeTracker::new(&config);
///
/// let start = RoadSnapshot {
///     ego: VehicleSnapshot::new(0, [0.0, 0.0], [30.0, 0.0]),
///     others: vec![VehicleSnapshot::new(1, [40.0, 4.0], [20.0, 0.0])],
/// };
/// tracker.start_episode(&start, 0, None);
///
/// let ahead = RoadSnapshot {
///     ego: VehicleSnapshot::new(0, [100.0, 0.0], [30.0, 0.0]),
///     others: vec![VehicleSnapshot::new(1, [60.0, 4.0], [20.0, 0.0])],
/// };
/// let obs = vec![vec![1.0, 0.0, 0.0, 30.0, 0.0]];
/// tracker.observe_step(&obs, &StepFeedback::default(), &ahead);
/// let info = tracker.observe_step(&obs, &StepFeedback::default(), &ahead);
/// assert!(info.overtaking_complete);
/// assert_eq!(info.reward_components.overtaking_success, 50.0);
/// ```
#[derive(Debug, Clone)]
pub struct OutcomeTracker {
    shaper: RewardShaper,
    reference_speed_threshold: f64,
    maintain_steps: usize,

    episode: usize,
    seed: Option<u64>,
    target: Option<VehicleId>,
    overtaking_started: bool,
    steps_ahead: usize,
    overtaking_complete: bool,
    bonus_awarded: bool,

    episode_length: usize,
    total_reward: f64,
    collision_occurred: bool,
    violation_count: usize,
    speed_sum: f64,
    speed_samples: usize,
}

impl OutcomeTracker {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            shaper: RewardShaper::new(config),
            reference_speed_threshold: config.overtaking_success.reference_speed_threshold,
            maintain_steps: config.overtaking_success.maintain_steps,
            episode: 0,
            seed: None,
            target: None,
            overtaking_started: false,
            steps_ahead: 0,
            overtaking_complete: false,
            bonus_awarded: false,
            episode_length: 0,
            total_reward: 0.0,
            collision_occurred: false,
            violation_count: 0,
            speed_sum: 0.0,
            speed_samples: 0,
        }
    }

    /// Reset all per-episode state and pick the overtaking target
    pub fn start_episode(&mut self, road: &RoadSnapshot, episode: usize, seed: Option<u64>) {
        self.episode = episode;
        self.seed = seed;
        self.target = select_target(road, self.reference_speed_threshold);
        self.overtaking_started = false;
        self.steps_ahead = 0;
        self.overtaking_complete = false;
        self.bonus_awarded = false;
        self.episode_length = 0;
        self.total_reward = 0.0;
        self.collision_occurred = false;
        self.violation_count = 0;
        self.speed_sum = 0.0;
        self.speed_samples = 0;

        match self.target {
            Some(id) => debug!(episode, target = %id, "overtaking target selected"),
            None => debug!(episode, "no slow vehicle ahead, overtaking cannot complete"),
        }
    }

    /// Account for one environment step
    ///
    /// `observation` and `road` are the post-step state.
    pub fn observe_step(
        &mut self,
        observation: &[Vec<f64>],
        feedback: &StepFeedback,
        road: &RoadSnapshot,
    ) -> StepInfo {
        self.episode_length += 1;

        let award_bonus = self.update_overtaking(road);
        let dangerous = self.shaper.is_dangerous(road);
        let components = self.shaper.components(feedback, dangerous, award_bonus);
        let reward = components.total();

        if dangerous {
            self.violation_count += 1;
        }
        if feedback.crashed {
            self.collision_occurred = true;
        }
        if let Some(ego) = Observation::from_rows(observation).ego() {
            self.speed_sum += ego.vx;
            self.speed_samples += 1;
        }
        self.total_reward += reward;

        StepInfo {
            reward,
            reward_components: components,
            violation: dangerous,
            crashed: feedback.crashed,
            overtaking_complete: self.overtaking_complete,
            episode_length: self.episode_length,
            violation_count: self.violation_count,
        }
    }

    /// Advance the state machine; true on the step the bonus is earned
    fn update_overtaking(&mut self, road: &RoadSnapshot) -> bool {
        if self.overtaking_complete {
            return false;
        }
        let Some(target_id) = self.target else {
            return false;
        };
        let Some(target) = road.vehicle(target_id) else {
            debug!(target = %target_id, "target not on road this step");
            return false;
        };

        if road.ego.position[0] > target.position[0] {
            self.steps_ahead += 1;
            self.overtaking_started = true;
            if self.steps_ahead >= self.maintain_steps {
                self.overtaking_complete = true;
            }
        } else {
            self.steps_ahead = 0;
        }

        if self.overtaking_complete && !self.bonus_awarded {
            self.bonus_awarded = true;
            info!(
                episode = self.episode,
                step = self.episode_length,
                target = %target_id,
                "overtake complete"
            );
            return true;
        }
        false
    }

    /// Freeze the episode into an outcome record
    pub fn finish(&self) -> EpisodeOutcome {
        EpisodeOutcome {
            episode: self.episode,
            seed: self.seed,
            total_reward: self.total_reward,
            episode_length: self.episode_length,
            collision_occurred: self.collision_occurred,
            overtaking_complete: self.overtaking_complete,
            total_violations: self.violation_count,
            avg_speed: if self.speed_samples > 0 {
                self.speed_sum / self.speed_samples as f64
            } else {
                0.0
            },
        }
    }

    pub fn target(&self) -> Option<VehicleId> {
        self.target
    }

    pub fn steps_ahead(&self) -> usize {
        self.steps_ahead
    }

    pub fn overtaking_started(&self) -> bool {
        self.overtaking_started
    }

    pub fn overtaking_complete(&self) -> bool {
        self.overtaking_complete
    }

    pub fn bonus_awarded(&self) -> bool {
        self.bonus_awarded
    }

    pub fn episode_length(&self) -> usize {
        self.episode_length
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn violation_count(&self) -> usize {
        self.violation_count
    }
}
