//! Vehicle kinematics as seen by the decision layer and by the simulator.
//!
//! Two views exist:
//! - [`VehicleRecord`]: ego-relative row of the kinematic observation
//!   (`[present, long_offset, lat_offset, vx, vy]`)
//! - [`VehicleSnapshot`]: absolute ground truth from the simulator, used only
//!   by the outcome tracker

use serde::{Deserialize, Serialize};

/// Number of features per observation row
pub const FEATURES_PER_VEHICLE: usize = 5;

/// Rows with presence below this value are empty slots
pub const PRESENCE_THRESHOLD: f64 = 0.5;

/// One slot of the fixed-size kinematic observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Slot occupancy; offsets and velocities are meaningless when false
    pub present: bool,
    /// Longitudinal offset from ego (positive = ahead)
    pub long_offset: f64,
    /// Lateral offset from ego (positive = left)
    pub lat_offset: f64,
    /// Longitudinal velocity
    pub vx: f64,
    /// Lateral velocity
    pub vy: f64,
}

impl VehicleRecord {
    /// Build a present record
    pub fn new(long_offset: f64, lat_offset: f64, vx: f64, vy: f64) -> Self {
        Self {
            present: true,
            long_offset,
            lat_offset,
            vx,
            vy,
        }
    }

    /// Decode a raw observation row (first five features)
    pub(crate) fn from_row(row: &[f64]) -> Self {
        Self {
            present: row[0] >= PRESENCE_THRESHOLD,
            long_offset: row[1],
            lat_offset: row[2],
            vx: row[3],
            vy: row[4],
        }
    }

    /// Encode back into a raw observation row
    pub fn to_row(&self) -> Vec<f64> {
        vec![
            if self.present { 1.0 } else { 0.0 },
            self.long_offset,
            self.lat_offset,
            self.vx,
            self.vy,
        ]
    }

    /// Longitudinal distance regardless of side
    pub fn distance(&self) -> f64 {
        self.long_offset.abs()
    }
}

/// Ego row of the observation
///
/// Only the relative lane class is recoverable from `lat_offset`, never an
/// absolute lane index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EgoState {
    pub lat_offset: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Stable simulator-assigned vehicle handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "veh_{:04}", self.0)
    }
}

/// Absolute position and velocity of one simulated vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    /// `[x, y]`, x along the road
    pub position: [f64; 2],
    /// `[vx, vy]`
    pub velocity: [f64; 2],
}

impl VehicleSnapshot {
    pub fn new(id: u64, position: [f64; 2], velocity: [f64; 2]) -> Self {
        Self {
            id: VehicleId(id),
            position,
            velocity,
        }
    }

    /// Euclidean distance between two vehicles
    pub fn distance_to(&self, other: &VehicleSnapshot) -> f64 {
        let dx = self.position[0] - other.position[0];
        let dy = self.position[1] - other.position[1];
        dx.hypot(dy)
    }
}

/// Ground-truth road state: the ego plus every other vehicle on the road
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSnapshot {
    pub ego: VehicleSnapshot,
    pub others: Vec<VehicleSnapshot>,
}

impl RoadSnapshot {
    /// Look up a non-ego vehicle by handle
    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleSnapshot> {
        self.others.iter().find(|v| v.id == id)
    }
}
