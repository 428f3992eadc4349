//! Scenario Environment
//!
//! Small seeded straight-road traffic environment implementing
//! [`Environment`]. It is a test bed for the decision layer, not a physics
//! engine:
//!
//! - Lanes are indexed from the right (lane 0 is the rightmost, reference
//!   lane); a lane change is instantaneous.
//! - The ego moves at one of a few discrete speeds; `Faster`/`Slower` step
//!   between them within `scenario.ego_min_speed..=scenario.ego_max_speed`.
//!   That range reaches below the slowest traffic, so braking behind a slow
//!   vehicle works.
//! - Other vehicles keep their lane and cruise at a sampled desired speed,
//!   matching the speed of a leader that is too close.
//! - The ego crashes when it overlaps, or passes through, a vehicle in its
//!   lane.
//!
//! # Observation
//!
//! Row 0 is the ego: `[1, x, lane × lane_width, vx, 0]`. The ego's lateral
//! value is measured from the rightmost lane, so a positive value means
//! "left of the reference lane". The following `observed_vehicles` rows are
//! the nearest other vehicles relative to the ego, nearest first, padded with
//! absent rows.

use tracing::{debug, trace};

use crate::config::{EvaluationConfig, ScenarioConfig, SpeedConfig};
use crate::evaluation::{Environment, EnvironmentError, EnvironmentReset, EnvironmentStep};
use crate::models::{DecisionAction, RoadSnapshot, VehicleRecord, VehicleSnapshot, FEATURES_PER_VEHICLE};
use crate::rng::TrafficRng;
use crate::tracker::{RewardBreakdown, StepFeedback};

/// Bumper-to-bumper length of every vehicle
pub const VEHICLE_LENGTH: f64 = 5.0;

/// Ego speed change per `Faster`/`Slower`
pub const EGO_SPEED_STEP: f64 = 5.0;

/// Range of desired speeds for other traffic
const TRAFFIC_SPEED_RANGE: (f64, f64) = (18.0, 28.0);

/// Vehicles are spawned at least this far apart within a lane
const MIN_SPAWN_GAP: f64 = 2.0 * VEHICLE_LENGTH;

/// Time gap below which traffic matches its leader's speed
const FOLLOW_HEADWAY: f64 = 1.0;

const SPAWN_ATTEMPTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimVehicle {
    id: u64,
    x: f64,
    lane: usize,
    speed: f64,
    desired_speed: f64,
}

impl SimVehicle {
    fn snapshot(&self, lane_width: f64) -> VehicleSnapshot {
        VehicleSnapshot::new(self.id, [self.x, self.lane as f64 * lane_width], [self.speed, 0.0])
    }
}

/// Seeded straight-road environment
///
/// # Example
/// ```
/// use highway_overtake_core_rs::evaluation::Environment;
/// use highway_overtake_core_rs::sim::ScenarioEnvironment;
/// use highway_overtake_core_rs::{DecisionAction, EvaluationConfig};
///
/// let mut env = ScenarioEnvironment::new(&EvaluationConfig::default());
/// let start = env.reset(Some(3)).unwrap();
/// assert_eq!(start.observation.len(), 6);
///
/// let step = env.step(DecisionAction::Idle).unwrap();
/// assert_eq!(step.feedback.rewards.on_road_reward, Some(1.0));
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioEnvironment {
    scenario: ScenarioConfig,
    speed: SpeedConfig,
    seeder: TrafficRng,
    rng: TrafficRng,
    ego: Option<SimVehicle>,
    traffic: Vec<SimVehicle>,
    steps: usize,
    done: bool,
}

impl ScenarioEnvironment {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self::with_seed(config, 0)
    }

    /// `base_seed` drives resets that are not given an explicit seed
    ///
    /// The configuration is sanitized first, so vehicle counts are bounded.
    pub fn with_seed(config: &EvaluationConfig, base_seed: u64) -> Self {
        let config = config.clone().sanitized();
        Self {
            scenario: config.scenario,
            speed: config.speed,
            seeder: TrafficRng::new(base_seed),
            rng: TrafficRng::new(base_seed),
            ego: None,
            traffic: Vec::new(),
            steps: 0,
            done: false,
        }
    }

    /// Number of non-ego vehicles on the road
    pub fn traffic_len(&self) -> usize {
        self.traffic.len()
    }

    /// Ego lane index, counted from the right (`None` before the first reset)
    pub fn ego_lane(&self) -> Option<usize> {
        self.ego.map(|e| e.lane)
    }

    fn lanes(&self) -> usize {
        self.scenario.lanes_count.max(1)
    }

    fn spawn(&mut self) {
        let lanes = self.lanes();
        let count = self.scenario.traffic_density.vehicles_count();
        let ego_lane = self.rng.index(lanes).unwrap_or(0);
        let ego_speed = self.clamp_ego_speed(self.speed.min + EGO_SPEED_STEP);
        let ego = SimVehicle {
            id: 0,
            x: 0.0,
            lane: ego_lane,
            speed: ego_speed,
            desired_speed: ego_speed,
        };

        // Keep average per-lane spacing roughly constant across densities
        let span = 40.0 + 15.0 * count as f64;
        let mut traffic: Vec<SimVehicle> = Vec::with_capacity(count);
        for id in 1..=count as u64 {
            for _ in 0..SPAWN_ATTEMPTS {
                let lane = self.rng.index(lanes).unwrap_or(0);
                let x = self.rng.uniform(-40.0, span);
                let blocked = std::iter::once(&ego)
                    .chain(traffic.iter())
                    .any(|v| v.lane == lane && (v.x - x).abs() < MIN_SPAWN_GAP);
                if blocked {
                    continue;
                }
                let desired = self.rng.uniform(TRAFFIC_SPEED_RANGE.0, TRAFFIC_SPEED_RANGE.1);
                traffic.push(SimVehicle {
                    id,
                    x,
                    lane,
                    speed: desired,
                    desired_speed: desired,
                });
                break;
            }
        }
        if traffic.len() < count {
            debug!(requested = count, spawned = traffic.len(), "road too crowded, spawned fewer vehicles");
        }

        self.ego = Some(ego);
        self.traffic = traffic;
    }

    fn clamp_ego_speed(&self, speed: f64) -> f64 {
        speed.clamp(self.scenario.ego_min_speed, self.scenario.ego_max_speed)
    }

    fn apply_action(&self, ego: &mut SimVehicle, action: DecisionAction) {
        let lanes = self.lanes();
        match action {
            DecisionAction::LaneLeft if ego.lane + 1 < lanes => ego.lane += 1,
            DecisionAction::LaneRight if ego.lane > 0 => ego.lane -= 1,
            DecisionAction::Faster => ego.speed = self.clamp_ego_speed(ego.speed + EGO_SPEED_STEP),
            DecisionAction::Slower => ego.speed = self.clamp_ego_speed(ego.speed - EGO_SPEED_STEP),
            // Lane changes off the road are ignored
            _ => {}
        }
    }

    /// Traffic speeds for this step: desired speed, or the leader's when too close
    fn traffic_speeds(&self, ego: &SimVehicle) -> Vec<f64> {
        self.traffic
            .iter()
            .map(|v| {
                let leader = std::iter::once(ego)
                    .chain(self.traffic.iter())
                    .filter(|o| o.id != v.id && o.lane == v.lane && o.x > v.x)
                    .min_by(|a, b| a.x.total_cmp(&b.x));
                match leader {
                    Some(l) if l.x - v.x - VEHICLE_LENGTH < v.desired_speed * FOLLOW_HEADWAY => {
                        v.desired_speed.min(l.speed)
                    }
                    _ => v.desired_speed,
                }
            })
            .collect()
    }

    fn observation(&self, ego: &SimVehicle) -> Vec<Vec<f64>> {
        let width = self.scenario.lane_width;
        let mut rows = Vec::with_capacity(self.scenario.observed_vehicles + 1);
        rows.push(vec![1.0, ego.x, ego.lane as f64 * width, ego.speed, 0.0]);

        let mut nearby: Vec<VehicleRecord> = self
            .traffic
            .iter()
            .map(|v| {
                VehicleRecord::new(
                    v.x - ego.x,
                    (v.lane as f64 - ego.lane as f64) * width,
                    v.speed,
                    0.0,
                )
            })
            .collect();
        nearby.sort_by(|a, b| a.distance().total_cmp(&b.distance()));

        rows.extend(
            nearby
                .iter()
                .take(self.scenario.observed_vehicles)
                .map(VehicleRecord::to_row),
        );
        rows.resize(self.scenario.observed_vehicles + 1, vec![0.0; FEATURES_PER_VEHICLE]);
        rows
    }

    fn road(&self, ego: &SimVehicle) -> RoadSnapshot {
        let width = self.scenario.lane_width;
        RoadSnapshot {
            ego: ego.snapshot(width),
            others: self.traffic.iter().map(|v| v.snapshot(width)).collect(),
        }
    }

    fn rewards(&self, ego: &SimVehicle) -> RewardBreakdown {
        let range = self.speed.max - self.speed.min;
        let high_speed = if range > 0.0 {
            ((ego.speed - self.speed.min) / range).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let top = (self.lanes() - 1).max(1) as f64;
        let right_lane = (self.lanes() - 1 - ego.lane) as f64 / top;
        RewardBreakdown {
            high_speed_reward: Some(high_speed),
            right_lane_reward: Some(right_lane),
            on_road_reward: Some(1.0),
        }
    }
}

impl Environment for ScenarioEnvironment {
    fn reset(&mut self, seed: Option<u64>) -> Result<EnvironmentReset, EnvironmentError> {
        let seed = seed.unwrap_or_else(|| self.seeder.next_u64());
        self.rng = TrafficRng::new(seed);
        self.steps = 0;
        self.done = false;
        self.spawn();

        let ego = self.ego.ok_or(EnvironmentError::NotReset)?;
        debug!(seed, vehicles = self.traffic.len(), lane = ego.lane, "scenario reset");
        Ok(EnvironmentReset {
            observation: self.observation(&ego),
            road: self.road(&ego),
        })
    }

    fn step(&mut self, action: DecisionAction) -> Result<EnvironmentStep, EnvironmentError> {
        let mut ego = self.ego.ok_or(EnvironmentError::NotReset)?;
        if self.done {
            return Err(EnvironmentError::EpisodeFinished { steps: self.steps });
        }

        self.apply_action(&mut ego, action);
        let dt = self.scenario.step_seconds;
        let speeds = self.traffic_speeds(&ego);

        let before: Vec<f64> = self.traffic.iter().map(|v| v.x - ego.x).collect();
        ego.x += ego.speed * dt;
        for (v, speed) in self.traffic.iter_mut().zip(speeds) {
            v.speed = speed;
            v.x += speed * dt;
        }

        let crashed = self.traffic.iter().zip(&before).any(|(v, &gap_before)| {
            if v.lane != ego.lane {
                return false;
            }
            let gap_after = v.x - ego.x;
            gap_after.abs() < VEHICLE_LENGTH || gap_before.signum() != gap_after.signum()
        });

        self.steps += 1;
        let truncated = self.steps >= self.scenario.duration;
        self.done = crashed || truncated;
        self.ego = Some(ego);

        trace!(step = self.steps, %action, x = ego.x, lane = ego.lane, speed = ego.speed, "scenario step");
        if crashed {
            debug!(step = self.steps, lane = ego.lane, "ego crashed");
        }

        Ok(EnvironmentStep {
            observation: self.observation(&ego),
            road: self.road(&ego),
            feedback: StepFeedback {
                rewards: self.rewards(&ego),
                crashed,
            },
            terminated: crashed,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TrafficDensity, MAX_OBSERVED_VEHICLES, MAX_TRAFFIC_VEHICLES};
    use crate::models::Observation;

    fn config(count: usize) -> EvaluationConfig {
        let mut config = EvaluationConfig::default();
        config.scenario.traffic_density = TrafficDensity::Count(count);
        config
    }

    #[test]
    fn test_same_seed_same_traffic() {
        let mut a = ScenarioEnvironment::new(&config(20));
        let mut b = ScenarioEnvironment::new(&config(20));
        assert_eq!(a.reset(Some(11)).unwrap(), b.reset(Some(11)).unwrap());
        for action in [DecisionAction::Faster, DecisionAction::LaneLeft, DecisionAction::Idle] {
            assert_eq!(a.step(action).unwrap(), b.step(action).unwrap());
        }
    }

    #[test]
    fn test_observation_shape_and_padding() {
        let mut env = ScenarioEnvironment::new(&config(2));
        let start = env.reset(Some(5)).unwrap();
        assert_eq!(start.observation.len(), 6);
        assert!(start.observation.iter().all(|r| r.len() == FEATURES_PER_VEHICLE));
        // Two vehicles at most, the rest padded absent
        let present = start.observation[1..].iter().filter(|r| r[0] >= 0.5).count();
        assert!(present <= 2);
        assert!(Observation::parse(&start.observation).is_ok());
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = ScenarioEnvironment::new(&config(5));
        assert_eq!(env.step(DecisionAction::Idle), Err(EnvironmentError::NotReset));
    }

    #[test]
    fn test_truncates_at_duration() {
        let mut cfg = config(0);
        cfg.scenario.duration = 4;
        let mut env = ScenarioEnvironment::new(&cfg);
        env.reset(Some(1)).unwrap();
        for _ in 0..3 {
            assert!(!env.step(DecisionAction::Idle).unwrap().done());
        }
        let last = env.step(DecisionAction::Idle).unwrap();
        assert!(last.truncated && !last.terminated);
        assert_eq!(
            env.step(DecisionAction::Idle),
            Err(EnvironmentError::EpisodeFinished { steps: 4 })
        );
    }

    #[test]
    fn test_lane_change_and_speed_bounds() {
        let mut cfg = config(0);
        cfg.scenario.lanes_count = 2;
        let mut env = ScenarioEnvironment::new(&cfg);
        env.reset(Some(9)).unwrap();

        for _ in 0..3 {
            env.step(DecisionAction::LaneLeft).unwrap();
        }
        assert_eq!(env.ego_lane(), Some(1));
        let step = env.step(DecisionAction::LaneRight).unwrap();
        assert_eq!(env.ego_lane(), Some(0));
        assert_eq!(step.feedback.rewards.right_lane_reward, Some(1.0));

        for _ in 0..5 {
            env.step(DecisionAction::Faster).unwrap();
        }
        let step = env.step(DecisionAction::Idle).unwrap();
        assert_eq!(step.observation[0][3], 30.0);
        assert_eq!(step.feedback.rewards.high_speed_reward, Some(1.0));
    }

    #[test]
    fn test_ego_brakes_below_reward_range() {
        let cfg = config(0);
        let mut env = ScenarioEnvironment::new(&cfg);
        env.reset(Some(4)).unwrap();

        let speeds: Vec<f64> = (0..4)
            .map(|_| env.step(DecisionAction::Slower).unwrap().observation[0][3])
            .collect();
        assert_eq!(speeds, vec![20.0, 15.0, 10.0, 10.0]);
        assert!(speeds[2] < TRAFFIC_SPEED_RANGE.0);

        let step = env.step(DecisionAction::Idle).unwrap();
        assert_eq!(step.feedback.rewards.high_speed_reward, Some(0.0));
    }

    #[test]
    fn test_braking_avoids_slow_leader() {
        let mut env = ScenarioEnvironment::new(&config(0));
        env.reset(Some(2)).unwrap();
        let lane = env.ego_lane().unwrap();
        // 20 ahead at 16: holding 25 closes the gap, braking to 15 opens it
        env.traffic.push(SimVehicle {
            id: 1,
            x: 20.0,
            lane,
            speed: 16.0,
            desired_speed: 16.0,
        });
        for _ in 0..5 {
            let step = env.step(DecisionAction::Slower).unwrap();
            assert!(!step.feedback.crashed);
        }
    }

    #[test]
    fn test_oversized_config_is_bounded() {
        let mut cfg = config(usize::MAX);
        cfg.scenario.observed_vehicles = usize::MAX;
        let mut env = ScenarioEnvironment::new(&cfg);
        let start = env.reset(Some(6)).unwrap();
        assert!(env.traffic_len() <= MAX_TRAFFIC_VEHICLES);
        assert_eq!(start.observation.len(), MAX_OBSERVED_VEHICLES + 1);
    }

    #[test]
    fn test_rear_end_is_a_crash() {
        let mut env = ScenarioEnvironment::new(&config(0));
        env.reset(Some(2)).unwrap();
        let lane = env.ego_lane().unwrap();
        env.traffic.push(SimVehicle {
            id: 1,
            x: 8.0,
            lane,
            speed: 0.0,
            desired_speed: 0.0,
        });
        let step = env.step(DecisionAction::Idle).unwrap();
        assert!(step.terminated);
        assert!(step.feedback.crashed);
    }

    #[test]
    fn test_unseeded_resets_differ() {
        let mut env = ScenarioEnvironment::with_seed(&config(20), 77);
        let first = env.reset(None).unwrap();
        let second = env.reset(None).unwrap();
        assert_ne!(first, second);
    }
}
