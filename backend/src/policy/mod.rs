//! Decision Source Module
//!
//! This module defines the capability interface for anything that can drive
//! the ego vehicle: the rule-based baseline, a learned policy behind an
//! adapter, or either of those wrapped by the safety shield.
//!
//! # Decision Interface
//!
//! All sources implement the `DecisionSource` trait:
//! ```rust
//! use highway_overtake_core_rs::policy::DecisionSource;
//! use highway_overtake_core_rs::DecisionAction;
//!
//! struct AlwaysIdle;
//!
//! impl DecisionSource for AlwaysIdle {
//!     fn propose(&mut self, _observation: &[Vec<f64>]) -> DecisionAction {
//!         DecisionAction::Idle
//!     }
//!
//!     fn name(&self) -> &str {
//!         "always_idle"
//!     }
//! }
//! ```
//!
//! Sources receive the raw observation rows, not a parsed
//! [`Observation`](crate::models::Observation): each consumer parses for
//! itself so that no component trusts another's interpretation.
//!
//! Available sources:
//! 1. **RuleBasedPolicy**: deterministic finite-state overtaking baseline
//! 2. **FnDecisionSource**: closure adapter for learned policies
//! 3. **ShieldedPolicy** (in `shield`): any source filtered by the safety shield

use crate::models::DecisionAction;

pub mod rule_based;

pub use rule_based::RuleBasedPolicy;

/// Anything that proposes a driving action from a kinematic observation
///
/// # Policy State
///
/// Sources may keep per-episode state (the rule-based policy keeps a
/// lane-change cooldown). The evaluation loop calls [`reset`](Self::reset)
/// at the start of every episode.
pub trait DecisionSource: Send {
    /// Propose the action for the current step
    ///
    /// Must not panic on malformed observations; return a safe action
    /// (normally `Idle`) instead.
    fn propose(&mut self, observation: &[Vec<f64>]) -> DecisionAction;

    /// Clear per-episode state
    fn reset(&mut self) {}

    /// Short identifier used in logs and report prefixes
    fn name(&self) -> &str;
}

impl<S: DecisionSource + ?Sized> DecisionSource for Box<S> {
    fn propose(&mut self, observation: &[Vec<f64>]) -> DecisionAction {
        (**self).propose(observation)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapter turning a closure into a [`DecisionSource`]
///
/// Used to plug externally trained policies into the evaluation loop.
///
/// # Example
/// ```
/// use highway_overtake_core_rs::policy::{DecisionSource, FnDecisionSource};
/// use highway_overtake_core_rs::DecisionAction;
///
/// let mut learned = FnDecisionSource::new("ppo", |_obs: &[Vec<f64>]| DecisionAction::Faster);
/// assert_eq!(learned.propose(&[]), DecisionAction::Faster);
/// assert_eq!(learned.name(), "ppo");
/// ```
pub struct FnDecisionSource<F> {
    name: String,
    decide: F,
}

impl<F> FnDecisionSource<F>
where
    F: FnMut(&[Vec<f64>]) -> DecisionAction + Send,
{
    pub fn new(name: impl Into<String>, decide: F) -> Self {
        Self {
            name: name.into(),
            decide,
        }
    }
}

impl<F> DecisionSource for FnDecisionSource<F>
where
    F: FnMut(&[Vec<f64>]) -> DecisionAction + Send,
{
    fn propose(&mut self, observation: &[Vec<f64>]) -> DecisionAction {
        (self.decide)(observation)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
