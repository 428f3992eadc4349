//! Highway Overtaking Decision Core - Rust Engine
//!
//! Safety-constrained decision layer for an autonomous vehicle overtaking on
//! a multi-lane highway, plus the machinery to evaluate it.
//!
//! # Architecture
//!
//! - **models**: Domain types (observation rows, actions, safety envelope)
//! - **policy**: Decision sources (rule-based baseline, closure adapter)
//! - **shield**: Policy-agnostic safety filter with intervention bookkeeping
//! - **tracker**: Per-episode reward shaping and overtaking success
//! - **metrics**: Summary statistics and evaluation reports
//! - **evaluation**: Episode loop over any `Environment`
//! - **sim**: Seeded straight-road scenario environment
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Malformed observations never panic; decisions fail closed to `Idle`
//! 2. The shield shares no mutable state with any policy
//! 3. All randomness is deterministic (seeded RNG)

// Module declarations
pub mod config;
pub mod evaluation;
pub mod metrics;
pub mod models;
pub mod policy;
pub mod rng;
pub mod shield;
pub mod sim;
pub mod tracker;

// Re-exports for convenience
pub use config::{ConfigError, EvaluationConfig, TrafficDensity};
pub use evaluation::{evaluate_policy, Environment, EnvironmentError, EvaluationError};
pub use metrics::{EvaluationReport, MetricsAggregator, MetricsSummary, ReportError};
pub use models::{
    ActionError, DecisionAction, EpisodeOutcome, Observation, ObservationError, RoadSnapshot,
    SafetyEnvelope, VehicleId, VehicleSnapshot,
};
pub use policy::{DecisionSource, FnDecisionSource, RuleBasedPolicy};
pub use rng::TrafficRng;
pub use shield::{SafetyShield, ShieldStatistics, ShieldedPolicy};
pub use sim::ScenarioEnvironment;
pub use tracker::{OutcomeTracker, StepFeedback, StepInfo};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn highway_overtake_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::PyRuleBasedPolicy>()?;
    m.add_class::<ffi::PySafetyShield>()?;
    m.add_class::<ffi::PyOutcomeTracker>()?;
    m.add_class::<ffi::PyMetricsAggregator>()?;
    m.add_function(wrap_pyfunction!(ffi::evaluate, m)?)?;
    Ok(())
}
