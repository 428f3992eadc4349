//! Evaluation Engine
//!
//! Drives a [`DecisionSource`] through episodes of an [`Environment`] and
//! collects one [`EpisodeOutcome`] per episode.
//!
//! # Step Loop
//!
//! ```text
//! reset(seed) ─▶ source.reset() ─▶ tracker.start_episode(road)
//!      │
//!      └─▶ loop: propose(obs) ─▶ env.step(action) ─▶ tracker.observe_step(..)
//!                until terminated || truncated
//! ```
//!
//! With a base seed, episode `i` is reset with `base + i`.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::EvaluationConfig;
use crate::metrics::MetricsAggregator;
use crate::models::{DecisionAction, EpisodeOutcome, RoadSnapshot};
use crate::policy::DecisionSource;
use crate::rng::episode_seed;
use crate::tracker::{OutcomeTracker, StepFeedback};

/// Failures reported by an environment
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("step called before reset")]
    NotReset,

    #[error("episode already finished after {steps} steps")]
    EpisodeFinished { steps: usize },

    #[error("environment failure: {0}")]
    Backend(String),
}

/// Evaluation errors
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("episode {episode}: {source}")]
    Environment {
        episode: usize,
        #[source]
        source: EnvironmentError,
    },
}

/// State right after a reset
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentReset {
    pub observation: Vec<Vec<f64>>,
    pub road: RoadSnapshot,
}

/// Result of applying one action
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentStep {
    pub observation: Vec<Vec<f64>>,
    pub road: RoadSnapshot,
    pub feedback: StepFeedback,
    /// Episode ended by an event (crash)
    pub terminated: bool,
    /// Episode ended by the time limit
    pub truncated: bool,
}

impl EnvironmentStep {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Traffic simulator seen by the evaluation loop
pub trait Environment {
    /// Start a new episode; `None` lets the environment pick its own seed
    fn reset(&mut self, seed: Option<u64>) -> Result<EnvironmentReset, EnvironmentError>;

    fn step(&mut self, action: DecisionAction) -> Result<EnvironmentStep, EnvironmentError>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn reset(&mut self, seed: Option<u64>) -> Result<EnvironmentReset, EnvironmentError> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: DecisionAction) -> Result<EnvironmentStep, EnvironmentError> {
        (**self).step(action)
    }
}

/// Run one episode to completion
pub fn run_episode<E, S>(
    env: &mut E,
    source: &mut S,
    tracker: &mut OutcomeTracker,
    episode: usize,
    seed: Option<u64>,
) -> Result<EpisodeOutcome, EvaluationError>
where
    E: Environment + ?Sized,
    S: DecisionSource + ?Sized,
{
    let wrap = |err: EnvironmentError| EvaluationError::Environment {
        episode,
        source: err,
    };

    let EnvironmentReset {
        mut observation,
        road,
    } = env.reset(seed).map_err(wrap)?;
    source.reset();
    tracker.start_episode(&road, episode, seed);

    loop {
        let action = source.propose(&observation);
        let step = env.step(action).map_err(wrap)?;
        let info = tracker.observe_step(&step.observation, &step.feedback, &step.road);
        debug!(
            episode,
            step = info.episode_length,
            %action,
            reward = info.reward,
            violation = info.violation,
            "step"
        );

        if step.done() {
            break;
        }
        observation = step.observation;
    }

    let outcome = tracker.finish();
    info!(
        episode,
        policy = source.name(),
        length = outcome.episode_length,
        reward = outcome.total_reward,
        collision = outcome.collision_occurred,
        overtake = outcome.overtaking_complete,
        "episode finished"
    );
    Ok(outcome)
}

/// Evaluate a decision source over `n_episodes` episodes
///
/// # Example
/// ```
/// use highway_overtake_core_rs::evaluation::evaluate_policy;
/// use highway_overtake_core_rs::policy::RuleBasedPolicy;
/// use highway_overtake_core_rs::sim::ScenarioEnvironment;
/// use highway_overtake_core_rs::EvaluationConfig;
///
/// let mut config = EvaluationConfig::default();
/// config.scenario.duration = 20;
/// let mut env = ScenarioEnvironment::new(&config);
/// let mut policy = RuleBasedPolicy::new(&config);
///
/// let metrics = evaluate_policy(&mut env, &mut policy, &config, 3, Some(7)).unwrap();
/// assert_eq!(metrics.len(), 3);
/// assert_eq!(metrics.episodes()[2].seed, Some(9));
/// ```
pub fn evaluate_policy<E, S>(
    env: &mut E,
    source: &mut S,
    config: &EvaluationConfig,
    n_episodes: usize,
    seed: Option<u64>,
) -> Result<MetricsAggregator, EvaluationError>
where
    E: Environment + ?Sized,
    S: DecisionSource + ?Sized,
{
    info!(policy = source.name(), n_episodes, ?seed, "evaluation started");

    let mut tracker = OutcomeTracker::new(config);
    let mut metrics = MetricsAggregator::new();
    for episode in 0..n_episodes {
        let reset_seed = seed.map(|base| episode_seed(base, episode));
        let outcome = run_episode(env, source, &mut tracker, episode, reset_seed)?;
        metrics.add_episode(outcome);
    }

    let summary = metrics.compute_summary();
    info!(
        policy = source.name(),
        success_rate = summary.success_rate,
        collision_rate = summary.collision_rate,
        violation_rate = summary.violation_rate,
        avg_reward = summary.avg_reward,
        "evaluation finished"
    );
    Ok(metrics)
}
