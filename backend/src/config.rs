//! Evaluation configuration
//!
//! Mirrors the section layout of the environment configuration file
//! (`safety`, `overtaking_success`, `speed`, `reward_weights`, ...). Every
//! field has a default, so a partial document deserializes cleanly; values
//! that deserialize but make no sense (negative distances, NaN weights, zero
//! hold steps) are replaced by their defaults in [`EvaluationConfig::sanitized`].
//!
//! Environment files keep `lanes_count`, `traffic_density`,
//! `episode.duration` and `observation.vehicles_count` at the top level.
//! Those keys are accepted too and folded into [`ScenarioConfig`]; when both
//! forms are present the top-level key wins.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::models::SafetyEnvelope;

/// Upper bound on non-ego vehicles spawned by the scenario environment
pub const MAX_TRAFFIC_VEHICLES: usize = 200;

/// Upper bound on non-ego observation slots
pub const MAX_OBSERVED_VEHICLES: usize = 50;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Safety limits shared by policy, shield and tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub min_safe_distance: f64,
    pub min_time_headway: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_safe_distance: 15.0,
            min_time_headway: 1.5,
        }
    }
}

/// What counts as a completed overtake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertakingSuccessConfig {
    /// Vehicles slower than this are overtaking targets (and "slow" to the policy)
    pub reference_speed_threshold: f64,
    /// Consecutive steps ego must stay ahead of the target
    pub maintain_steps: usize,
}

impl Default for OvertakingSuccessConfig {
    fn default() -> Self {
        Self {
            reference_speed_threshold: 25.0,
            maintain_steps: 30,
        }
    }
}

/// Speed targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Cruise speed the rule-based policy accelerates towards
    pub ego_target: f64,
    /// Lower end of the high-speed reward range
    pub min: f64,
    /// Upper end of the high-speed reward range
    pub max: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            ego_target: 30.0,
            min: 20.0,
            max: 30.0,
        }
    }
}

/// Weights applied to the environment's raw reward terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Flat penalty on a crash step
    pub collision: f64,
    pub high_speed_reward: f64,
    pub right_lane_reward: f64,
    pub on_road_reward: f64,
    /// Flat penalty on steps with a vehicle inside the safe distance
    pub dangerous_distance: f64,
    /// One-time bonus when the overtake completes
    pub overtaking_success: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            collision: -100.0,
            high_speed_reward: 0.4,
            right_lane_reward: 0.1,
            on_road_reward: 1.0,
            dangerous_distance: -10.0,
            overtaking_success: 50.0,
        }
    }
}

/// Rule-based policy tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTuning {
    /// Steps before another lane change may be proposed
    pub cooldown_steps: u32,
    /// A slow front vehicle closer than this triggers an overtake attempt
    pub overtake_trigger_distance: f64,
}

impl Default for PolicyTuning {
    fn default() -> Self {
        Self {
            cooldown_steps: 10,
            overtake_trigger_distance: 50.0,
        }
    }
}

/// Safety shield tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldTuning {
    /// `FASTER` is blocked when the front vehicle is within
    /// `faster_margin × min_safe_distance`
    pub faster_margin: f64,
}

impl Default for ShieldTuning {
    fn default() -> Self {
        Self { faster_margin: 1.5 }
    }
}

/// Traffic density as written in config files
///
/// Accepts a level name (`"low"`, `"medium"`, `"high"`), a vehicle count,
/// or a map of level names to counts (in which case `medium` is used).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrafficDensity {
    Count(usize),
    Named(String),
    Levels(BTreeMap<String, usize>),
}

impl Default for TrafficDensity {
    fn default() -> Self {
        TrafficDensity::Named("medium".to_string())
    }
}

impl TrafficDensity {
    const DEFAULT_COUNT: usize = 20;

    /// Number of non-ego vehicles on the road
    pub fn vehicles_count(&self) -> usize {
        match self {
            TrafficDensity::Count(n) => *n,
            TrafficDensity::Named(name) => Self::named_count(name),
            TrafficDensity::Levels(levels) => levels
                .get("medium")
                .copied()
                .unwrap_or(Self::DEFAULT_COUNT),
        }
    }

    /// Short label used in report file prefixes
    pub fn label(&self) -> String {
        match self {
            TrafficDensity::Count(n) => format!("{}veh", n),
            TrafficDensity::Named(name) => name.clone(),
            TrafficDensity::Levels(_) => "medium".to_string(),
        }
    }

    fn named_count(name: &str) -> usize {
        match name {
            "low" => 10,
            "medium" => 20,
            "high" => 30,
            _ => Self::DEFAULT_COUNT,
        }
    }
}

/// Scenario environment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub lanes_count: usize,
    pub traffic_density: TrafficDensity,
    /// Episode length limit in policy steps
    pub duration: usize,
    /// Seconds per policy step
    pub step_seconds: f64,
    /// Lateral distance between lane centres
    pub lane_width: f64,
    /// Observation slots for non-ego vehicles
    pub observed_vehicles: usize,
    /// Slowest speed the simulated ego can brake to
    pub ego_min_speed: f64,
    /// Fastest speed the simulated ego can reach
    pub ego_max_speed: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            lanes_count: 3,
            traffic_density: TrafficDensity::default(),
            duration: 120,
            step_seconds: 1.0,
            lane_width: 4.0,
            observed_vehicles: 5,
            ego_min_speed: 10.0,
            ego_max_speed: 30.0,
        }
    }
}

/// Complete evaluation configuration
///
/// # Example
/// ```
/// use highway_overtake_core_rs::EvaluationConfig;
///
/// let config = EvaluationConfig::from_json_str(r#"{"safety": {"min_safe_distance": 20.0}}"#).unwrap();
/// assert_eq!(config.safety.min_safe_distance, 20.0);
/// assert_eq!(config.safety.min_time_headway, 1.5);
/// assert_eq!(config.overtaking_success.maintain_steps, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ConfigDocument")]
pub struct EvaluationConfig {
    pub safety: SafetyConfig,
    pub overtaking_success: OvertakingSuccessConfig,
    pub speed: SpeedConfig,
    pub reward_weights: RewardWeights,
    pub policy: PolicyTuning,
    pub shield: ShieldTuning,
    pub scenario: ScenarioConfig,
}

impl EvaluationConfig {
    /// Parse from a JSON document, then sanitize
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EvaluationConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Safety envelope derived from the `safety` section
    pub fn envelope(&self) -> SafetyEnvelope {
        SafetyEnvelope::new(self.safety.min_safe_distance, self.safety.min_time_headway)
    }

    /// Replace invalid values with their defaults
    ///
    /// Each replacement is logged at `warn` level.
    pub fn sanitized(mut self) -> Self {
        let safety = SafetyConfig::default();
        fallback_positive(&mut self.safety.min_safe_distance, safety.min_safe_distance, "safety.min_safe_distance");
        fallback_positive(&mut self.safety.min_time_headway, safety.min_time_headway, "safety.min_time_headway");

        let success = OvertakingSuccessConfig::default();
        fallback_finite(
            &mut self.overtaking_success.reference_speed_threshold,
            success.reference_speed_threshold,
            "overtaking_success.reference_speed_threshold",
        );
        if self.overtaking_success.maintain_steps == 0 {
            warn!(
                field = "overtaking_success.maintain_steps",
                default = success.maintain_steps,
                "invalid config value, using default"
            );
            self.overtaking_success.maintain_steps = success.maintain_steps;
        }

        let speed = SpeedConfig::default();
        fallback_finite(&mut self.speed.ego_target, speed.ego_target, "speed.ego_target");
        fallback_finite(&mut self.speed.min, speed.min, "speed.min");
        fallback_finite(&mut self.speed.max, speed.max, "speed.max");
        if self.speed.max <= self.speed.min {
            warn!(min = self.speed.min, max = self.speed.max, "empty speed range, using defaults");
            self.speed.min = speed.min;
            self.speed.max = speed.max;
        }

        let weights = RewardWeights::default();
        let w = &mut self.reward_weights;
        fallback_finite(&mut w.collision, weights.collision, "reward_weights.collision");
        fallback_finite(&mut w.high_speed_reward, weights.high_speed_reward, "reward_weights.high_speed_reward");
        fallback_finite(&mut w.right_lane_reward, weights.right_lane_reward, "reward_weights.right_lane_reward");
        fallback_finite(&mut w.on_road_reward, weights.on_road_reward, "reward_weights.on_road_reward");
        fallback_finite(&mut w.dangerous_distance, weights.dangerous_distance, "reward_weights.dangerous_distance");
        fallback_finite(&mut w.overtaking_success, weights.overtaking_success, "reward_weights.overtaking_success");

        let tuning = PolicyTuning::default();
        fallback_positive(
            &mut self.policy.overtake_trigger_distance,
            tuning.overtake_trigger_distance,
            "policy.overtake_trigger_distance",
        );
        fallback_positive(&mut self.shield.faster_margin, ShieldTuning::default().faster_margin, "shield.faster_margin");

        let scenario = ScenarioConfig::default();
        let s = &mut self.scenario;
        if s.lanes_count == 0 {
            warn!(field = "scenario.lanes_count", default = scenario.lanes_count, "invalid config value, using default");
            s.lanes_count = scenario.lanes_count;
        }
        if s.duration == 0 {
            warn!(field = "scenario.duration", default = scenario.duration, "invalid config value, using default");
            s.duration = scenario.duration;
        }
        fallback_positive(&mut s.step_seconds, scenario.step_seconds, "scenario.step_seconds");
        fallback_positive(&mut s.lane_width, scenario.lane_width, "scenario.lane_width");
        fallback_positive(&mut s.ego_min_speed, scenario.ego_min_speed, "scenario.ego_min_speed");
        fallback_positive(&mut s.ego_max_speed, scenario.ego_max_speed, "scenario.ego_max_speed");
        if s.ego_max_speed <= s.ego_min_speed {
            warn!(min = s.ego_min_speed, max = s.ego_max_speed, "empty ego speed range, using defaults");
            s.ego_min_speed = scenario.ego_min_speed;
            s.ego_max_speed = scenario.ego_max_speed;
        }
        let vehicles = s.traffic_density.vehicles_count();
        if vehicles > MAX_TRAFFIC_VEHICLES {
            warn!(vehicles, cap = MAX_TRAFFIC_VEHICLES, "traffic density too high, capping");
            s.traffic_density = TrafficDensity::Count(MAX_TRAFFIC_VEHICLES);
        }
        if s.observed_vehicles > MAX_OBSERVED_VEHICLES {
            warn!(
                observed = s.observed_vehicles,
                cap = MAX_OBSERVED_VEHICLES,
                "too many observation slots, capping"
            );
            s.observed_vehicles = MAX_OBSERVED_VEHICLES;
        }

        self
    }

    /// Deterministic SHA-256 fingerprint of the configuration
    ///
    /// Serializes through `serde_json::Value` with every object's keys sorted,
    /// so the hash depends only on content.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        use serde_json::Value;

        fn canonicalize(value: Value) -> Value {
            match value {
                Value::Object(map) => {
                    let sorted: BTreeMap<String, Value> =
                        map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                    Value::Object(sorted.into_iter().collect())
                }
                Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
                other => other,
            }
        }

        let canonical = canonicalize(serde_json::to_value(self)?);
        let json = serde_json::to_string(&canonical)?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// On-disk layout: the sections plus the environment file's top-level keys
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    safety: SafetyConfig,
    overtaking_success: OvertakingSuccessConfig,
    speed: SpeedConfig,
    reward_weights: RewardWeights,
    policy: PolicyTuning,
    shield: ShieldTuning,
    scenario: ScenarioConfig,
    lanes_count: Option<usize>,
    traffic_density: Option<TrafficDensity>,
    episode: EpisodeSection,
    observation: ObservationSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EpisodeSection {
    duration: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ObservationSection {
    /// Observed vehicles including the ego row
    vehicles_count: Option<usize>,
}

impl From<ConfigDocument> for EvaluationConfig {
    fn from(doc: ConfigDocument) -> Self {
        let mut scenario = doc.scenario;
        if let Some(lanes) = doc.lanes_count {
            scenario.lanes_count = lanes;
        }
        if let Some(density) = doc.traffic_density {
            scenario.traffic_density = density;
        }
        if let Some(duration) = doc.episode.duration {
            scenario.duration = duration;
        }
        if let Some(count) = doc.observation.vehicles_count {
            scenario.observed_vehicles = count.saturating_sub(1);
        }
        Self {
            safety: doc.safety,
            overtaking_success: doc.overtaking_success,
            speed: doc.speed,
            reward_weights: doc.reward_weights,
            policy: doc.policy,
            shield: doc.shield,
            scenario,
        }
    }
}

fn fallback_finite(value: &mut f64, default: f64, field: &'static str) {
    if !value.is_finite() {
        warn!(field, value = *value, default, "invalid config value, using default");
        *value = default;
    }
}

fn fallback_positive(value: &mut f64, default: f64, field: &'static str) {
    if !value.is_finite() || *value <= 0.0 {
        warn!(field, value = *value, default, "invalid config value, using default");
        *value = default;
    }
}
