//! Composition of an arbitrary decision source with the safety shield.

use super::{SafetyShield, ShieldStatistics};
use crate::models::DecisionAction;
use crate::policy::DecisionSource;

/// Decision source whose every proposal passes through a [`SafetyShield`]
///
/// `reset` is forwarded to the wrapped source only; shield counters keep
/// accumulating across the episodes of an evaluation run.
///
/// # Example
/// ```
/// use highway_overtake_core_rs::policy::{DecisionSource, FnDecisionSource};
/// use highway_overtake_core_rs::shield::{SafetyShield, ShieldedPolicy};
/// use highway_overtake_core_rs::{DecisionAction, EvaluationConfig};
///
/// let config = EvaluationConfig::default();
/// let reckless = FnDecisionSource::new("reckless", |_obs: &[Vec<f64>]| DecisionAction::LaneLeft);
/// let mut shielded = ShieldedPolicy::new(reckless, SafetyShield::new(&config));
///
/// let obs = vec![vec![1.0, 0.0, 0.0, 25.0, 0.0], vec![1.0, -3.0, 4.0, 25.0, 0.0]];
/// assert_eq!(shielded.propose(&obs), DecisionAction::Idle);
/// assert_eq!(shielded.statistics().total_interventions, 1);
/// ```
pub struct ShieldedPolicy<P> {
    inner: P,
    shield: SafetyShield,
    name: String,
    last_corrected: bool,
}

impl<P: DecisionSource> ShieldedPolicy<P> {
    pub fn new(inner: P, shield: SafetyShield) -> Self {
        let name = format!("{}_safety", inner.name());
        Self {
            inner,
            shield,
            name,
            last_corrected: false,
        }
    }

    pub fn statistics(&self) -> ShieldStatistics {
        self.shield.statistics()
    }

    /// Whether the most recent proposal was overridden
    pub fn last_corrected(&self) -> bool {
        self.last_corrected
    }

    pub fn into_parts(self) -> (P, SafetyShield) {
        (self.inner, self.shield)
    }
}

impl<P: DecisionSource> DecisionSource for ShieldedPolicy<P> {
    fn propose(&mut self, observation: &[Vec<f64>]) -> DecisionAction {
        let proposed = self.inner.propose(observation);
        let (action, corrected) = self.shield.check_and_correct(observation, proposed);
        self.last_corrected = corrected;
        action
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.last_corrected = false;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
