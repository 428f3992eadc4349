//! Python bindings (feature `pyo3`)
//!
//! Exposes the policy, shield, tracker and aggregator so the Python
//! highway environment can use the Rust decision layer directly.

pub mod classes;
pub mod types;

pub use classes::{
    evaluate, PyCallableSource, PyMetricsAggregator, PyOutcomeTracker, PyRuleBasedPolicy,
    PySafetyShield,
};
