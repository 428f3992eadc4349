//! Metrics aggregation
//!
//! Reduces the ordered list of [`EpisodeOutcome`]s of an evaluation run to
//! summary statistics. Rates are percentages; every statistic is 0 for an
//! empty run.

use serde::{Deserialize, Serialize};

use crate::models::EpisodeOutcome;

pub mod report;

pub use report::{EvaluationReport, ReportError};

/// Summary statistics over an evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_episodes: usize,
    /// Percentage of episodes with a completed overtake
    pub success_rate: f64,
    /// Percentage of episodes with a collision
    pub collision_rate: f64,
    /// Percentage of episodes with at least one safety violation
    pub violation_rate: f64,
    pub avg_violations_per_episode: f64,
    pub avg_reward: f64,
    pub avg_speed: f64,
    pub avg_episode_length: f64,
    /// Mean episode length over successful episodes (0 when there are none)
    pub avg_success_time: f64,
}

/// Accumulates completed episodes
///
/// # Example
/// ```
/// use highway_overtake_core_rs::metrics::MetricsAggregator;
/// use highway_overtake_core_rs::models::EpisodeOutcome;
///
/// let mut metrics = MetricsAggregator::new();
/// assert_eq!(metrics.compute_summary().success_rate, 0.0);
///
/// metrics.add_episode(EpisodeOutcome {
///     overtaking_complete: true,
///     episode_length: 120,
///     ..EpisodeOutcome::default()
/// });
/// let summary = metrics.compute_summary();
/// assert_eq!(summary.success_rate, 100.0);
/// assert_eq!(summary.avg_success_time, 120.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    episodes: Vec<EpisodeOutcome>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_episode(&mut self, outcome: EpisodeOutcome) {
        self.episodes.push(outcome);
    }

    /// Episodes in the order they were added
    pub fn episodes(&self) -> &[EpisodeOutcome] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.episodes.clear();
    }

    pub fn compute_summary(&self) -> MetricsSummary {
        let n = self.episodes.len();
        if n == 0 {
            return MetricsSummary::default();
        }

        let count = |pred: fn(&EpisodeOutcome) -> bool| {
            self.episodes.iter().filter(|e| pred(e)).count() as f64
        };
        let mean = |field: fn(&EpisodeOutcome) -> f64| {
            self.episodes.iter().map(field).sum::<f64>() / n as f64
        };
        let percent = |k: f64| 100.0 * k / n as f64;

        let success_lengths: Vec<f64> = self
            .episodes
            .iter()
            .filter(|e| e.overtaking_complete)
            .map(|e| e.episode_length as f64)
            .collect();
        let avg_success_time = if success_lengths.is_empty() {
            0.0
        } else {
            success_lengths.iter().sum::<f64>() / success_lengths.len() as f64
        };

        MetricsSummary {
            total_episodes: n,
            success_rate: percent(count(|e| e.overtaking_complete)),
            collision_rate: percent(count(|e| e.collision_occurred)),
            violation_rate: percent(count(|e| e.total_violations > 0)),
            avg_violations_per_episode: mean(|e| e.total_violations as f64),
            avg_reward: mean(|e| e.total_reward),
            avg_speed: mean(|e| e.avg_speed),
            avg_episode_length: mean(|e| e.episode_length as f64),
            avg_success_time,
        }
    }
}

impl Extend<EpisodeOutcome> for MetricsAggregator {
    fn extend<T: IntoIterator<Item = EpisodeOutcome>>(&mut self, iter: T) {
        self.episodes.extend(iter);
    }
}

impl FromIterator<EpisodeOutcome> for MetricsAggregator {
    fn from_iter<T: IntoIterator<Item = EpisodeOutcome>>(iter: T) -> Self {
        Self {
            episodes: iter.into_iter().collect(),
        }
    }
}
