//! Lane-change safety envelope
//!
//! Distance and time-headway limits applied to the target lane's nearest
//! front and rear vehicles. Both the rule-based policy and the safety shield
//! hold their own copy of a [`SafetyEnvelope`]; the check itself is a pure
//! function of the observation.

use serde::{Deserialize, Serialize};

use super::observation::{LaneClass, Observation, RelativeQuery};
use super::vehicle::VehicleRecord;

/// Relative speeds at or below this magnitude count as "not closing"
pub const RELATIVE_SPEED_EPSILON: f64 = 0.1;

/// Outcome of a lane-change check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaneChangeAssessment {
    Safe,
    /// Front vehicle in the target lane is closer than the minimum gap
    FrontTooClose { distance: f64 },
    /// Closing on the front vehicle faster than the headway allows
    HeadwayTooShort { headway: f64 },
    /// Rear vehicle in the target lane is closer than the minimum gap
    RearTooClose { distance: f64 },
}

impl LaneChangeAssessment {
    pub fn is_safe(&self) -> bool {
        matches!(self, LaneChangeAssessment::Safe)
    }
}

/// Distance and headway limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyEnvelope {
    /// Minimum longitudinal gap to any vehicle in the target lane
    pub min_safe_distance: f64,
    /// Minimum time to close on the target lane's front vehicle (seconds)
    pub min_time_headway: f64,
}

impl Default for SafetyEnvelope {
    fn default() -> Self {
        Self {
            min_safe_distance: 15.0,
            min_time_headway: 1.5,
        }
    }
}

impl SafetyEnvelope {
    pub fn new(min_safe_distance: f64, min_time_headway: f64) -> Self {
        Self {
            min_safe_distance,
            min_time_headway,
        }
    }

    /// Check a lane change given the target lane's nearest neighbours
    ///
    /// # Example
    /// ```
    /// use highway_overtake_core_rs::models::{SafetyEnvelope, VehicleRecord};
    ///
    /// let envelope = SafetyEnvelope::default();
    /// let front = VehicleRecord::new(10.0, 0.3, 25.0, 0.0);
    /// assert!(!envelope.assess(Some(&front), None, 20.0).is_safe());
    /// assert!(envelope.assess(None, None, 20.0).is_safe());
    /// ```
    pub fn assess(
        &self,
        front: Option<&VehicleRecord>,
        rear: Option<&VehicleRecord>,
        ego_vx: f64,
    ) -> LaneChangeAssessment {
        if let Some(front) = front {
            let distance = front.long_offset;
            if distance < self.min_safe_distance {
                return LaneChangeAssessment::FrontTooClose { distance };
            }

            let relative_speed = front.vx - ego_vx;
            if relative_speed < 0.0 {
                let headway = if relative_speed.abs() > RELATIVE_SPEED_EPSILON {
                    distance / relative_speed.abs()
                } else {
                    f64::INFINITY
                };
                if headway < self.min_time_headway {
                    return LaneChangeAssessment::HeadwayTooShort { headway };
                }
            }
        }

        if let Some(rear) = rear {
            let distance = rear.long_offset.abs();
            if distance < self.min_safe_distance {
                return LaneChangeAssessment::RearTooClose { distance };
            }
        }

        LaneChangeAssessment::Safe
    }

    /// Check a lane change toward `lane` directly against an observation
    ///
    /// A malformed observation has no ego and is never safe.
    pub fn assess_lane(&self, observation: &Observation, lane: LaneClass) -> Option<LaneChangeAssessment> {
        let ego = observation.ego()?;
        let front = observation.find(RelativeQuery::front(lane));
        let rear = observation.find(RelativeQuery::rear(lane));
        Some(self.assess(front, rear, ego.vx))
    }
}
