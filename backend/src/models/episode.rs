//! Completed-episode record

use serde::{Deserialize, Serialize};

/// Outcome of one finished episode
///
/// Produced by [`OutcomeTracker::finish`](crate::tracker::OutcomeTracker::finish)
/// and appended to the metrics aggregator, which only ever hands out shared
/// references to it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    /// Episode index within the evaluation run
    pub episode: usize,
    /// Seed the environment was reset with, if any
    pub seed: Option<u64>,
    /// Sum of shaped rewards
    pub total_reward: f64,
    /// Number of environment steps
    pub episode_length: usize,
    /// Ego crashed at some step
    pub collision_occurred: bool,
    /// Ego held a lead over the target vehicle for `maintain_steps`
    pub overtaking_complete: bool,
    /// Steps with another vehicle inside the minimum safe distance
    pub total_violations: usize,
    /// Mean ego longitudinal speed over the episode
    pub avg_speed: f64,
}
