//! PyO3 wrappers for the decision layer
//!
//! Lets the Python highway environment drive the Rust policy, shield,
//! tracker and aggregator step by step, and run a whole evaluation in Rust
//! with a Python callable as the decision source.

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing::warn;

use super::types::{from_py, parse_config, parse_road, to_py};
use crate::evaluation::evaluate_policy;
use crate::metrics::MetricsAggregator;
use crate::models::{DecisionAction, EpisodeOutcome};
use crate::policy::{DecisionSource, RuleBasedPolicy};
use crate::shield::{SafetyShield, ShieldedPolicy};
use crate::sim::ScenarioEnvironment;
use crate::tracker::{OutcomeTracker, RewardBreakdown, StepFeedback};

/// Python wrapper for the rule-based baseline
///
/// # Example (from Python)
///
/// ```python
/// from highway_overtake_core_rs import RuleBasedPolicy
///
/// policy = RuleBasedPolicy({"policy": {"cooldown_steps": 8}})
/// action, _ = policy.predict(obs)
/// ```
#[pyclass(name = "RuleBasedPolicy")]
pub struct PyRuleBasedPolicy {
    inner: RuleBasedPolicy,
}

#[pymethods]
impl PyRuleBasedPolicy {
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        Ok(Self {
            inner: RuleBasedPolicy::new(&parse_config(config)?),
        })
    }

    /// Stable-Baselines style `(action, state)` pair
    #[pyo3(signature = (observation, deterministic=true))]
    fn predict(&mut self, observation: Vec<Vec<f64>>, deterministic: bool) -> (u8, Option<PyObject>) {
        let _ = deterministic;
        (self.inner.propose(&observation).index(), None)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    #[getter]
    fn cooldown(&self) -> u32 {
        self.inner.cooldown()
    }
}

/// Python wrapper for the safety shield
#[pyclass(name = "SafetyShield")]
pub struct PySafetyShield {
    inner: SafetyShield,
}

#[pymethods]
impl PySafetyShield {
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        Ok(Self {
            inner: SafetyShield::new(&parse_config(config)?),
        })
    }

    /// Returns `(safe_action, was_corrected)`
    ///
    /// Integers outside 0..=4 fail closed to IDLE.
    fn check_and_correct(&mut self, observation: Vec<Vec<f64>>, action: i64) -> (u8, bool) {
        let (action, corrected) = self.inner.check_and_correct_index(&observation, action);
        (action.index(), corrected)
    }

    fn get_statistics(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &self.inner.statistics())
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// Python wrapper for the episode outcome tracker
#[pyclass(name = "OutcomeTracker")]
pub struct PyOutcomeTracker {
    inner: OutcomeTracker,
}

#[pymethods]
impl PyOutcomeTracker {
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        Ok(Self {
            inner: OutcomeTracker::new(&parse_config(config)?),
        })
    }

    #[pyo3(signature = (road, episode=0, seed=None))]
    fn start_episode(&mut self, road: &Bound<'_, PyDict>, episode: usize, seed: Option<u64>) -> PyResult<()> {
        self.inner.start_episode(&parse_road(road)?, episode, seed);
        Ok(())
    }

    /// Account for one step; returns the augmented step info as a dict
    #[pyo3(signature = (observation, road, crashed=false, rewards=None))]
    fn observe_step(
        &mut self,
        py: Python<'_>,
        observation: Vec<Vec<f64>>,
        road: &Bound<'_, PyDict>,
        crashed: bool,
        rewards: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<PyObject> {
        let rewards: RewardBreakdown = match rewards {
            Some(dict) => from_py(dict.as_any())?,
            None => RewardBreakdown::default(),
        };
        let feedback = StepFeedback { rewards, crashed };
        let info = self.inner.observe_step(&observation, &feedback, &parse_road(road)?);
        to_py(py, &info)
    }

    fn finish(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &self.inner.finish())
    }
}

/// Python wrapper for the metrics aggregator
#[pyclass(name = "MetricsAggregator")]
#[derive(Default)]
pub struct PyMetricsAggregator {
    inner: MetricsAggregator,
}

#[pymethods]
impl PyMetricsAggregator {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    fn add_episode(&mut self, outcome: &Bound<'_, PyAny>) -> PyResult<()> {
        let outcome: EpisodeOutcome = from_py(outcome)?;
        self.inner.add_episode(outcome);
        Ok(())
    }

    fn compute_summary(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &self.inner.compute_summary())
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Decision source backed by a Python callable `f(observation) -> int`
///
/// Exceptions and invalid return values are logged and answered with IDLE.
pub struct PyCallableSource {
    callable: PyObject,
    name: String,
}

impl PyCallableSource {
    pub fn new(callable: PyObject, name: impl Into<String>) -> Self {
        Self {
            callable,
            name: name.into(),
        }
    }
}

impl DecisionSource for PyCallableSource {
    fn propose(&mut self, observation: &[Vec<f64>]) -> DecisionAction {
        let result = Python::with_gil(|py| {
            self.callable
                .call1(py, (observation.to_vec(),))
                .and_then(|value| value.extract::<i64>(py))
        });
        match result {
            Ok(index) => DecisionAction::try_from(index).unwrap_or_else(|err| {
                warn!(error = %err, policy = %self.name, "invalid action from Python policy");
                DecisionAction::Idle
            }),
            Err(err) => {
                warn!(error = %err, policy = %self.name, "Python policy raised");
                DecisionAction::Idle
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Evaluate a Python policy callable on the scenario environment
///
/// Returns `{"summary": {...}, "episodes": [...], "shield": {...} | None}`.
#[pyfunction]
#[pyo3(signature = (policy, config=None, n_episodes=10, seed=None, shielded=false, name="external"))]
pub fn evaluate(
    py: Python<'_>,
    policy: PyObject,
    config: Option<&Bound<'_, PyDict>>,
    n_episodes: usize,
    seed: Option<u64>,
    shielded: bool,
    name: &str,
) -> PyResult<PyObject> {
    let config = parse_config(config)?;
    let mut env = ScenarioEnvironment::new(&config);
    let source = PyCallableSource::new(policy, name);

    let (metrics, shield) = if shielded {
        let mut wrapped = ShieldedPolicy::new(source, SafetyShield::new(&config));
        let metrics = evaluate_policy(&mut env, &mut wrapped, &config, n_episodes, seed);
        (metrics, Some(wrapped.statistics()))
    } else {
        let mut source = source;
        (evaluate_policy(&mut env, &mut source, &config, n_episodes, seed), None)
    };
    let metrics = metrics.map_err(|e| PyRuntimeError::new_err(format!("Evaluation failed: {}", e)))?;

    let result = PyDict::new_bound(py);
    result.set_item("summary", to_py(py, &metrics.compute_summary())?)?;
    result.set_item("episodes", to_py(py, &metrics.episodes())?)?;
    result.set_item("shield", to_py(py, &shield)?)?;
    Ok(result.into_any().unbind())
}
