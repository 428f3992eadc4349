//! Relative-observation model
//!
//! Turns the fixed-shape kinematic observation (ego row first, then one row
//! per tracked vehicle) into "nearest vehicle in lane X, position Y" lookups.
//!
//! # Classification
//!
//! - Lane: `Same` if `|lat| <= 0.1`, `Left` if `lat >= 0.1`, `Right` if
//!   `lat <= -0.1`
//! - Position: `Front` if `long >= 0`, `Rear` if `long < 0`
//!
//! The rule-based policy and the safety shield both query through this
//! module so the two can never disagree on what "the car in front" is.
//!
//! # Malformed input
//!
//! An observation with no ego row, a row shorter than
//! [`FEATURES_PER_VEHICLE`], or a non-finite value in the ego row or a
//! present row is malformed. [`Observation::parse`] reports why;
//! [`Observation::from_rows`] swallows the error and every query returns
//! `None`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::vehicle::{EgoState, VehicleRecord, FEATURES_PER_VEHICLE};

/// Lateral tolerance separating the lane classes
pub const LANE_TOLERANCE: f64 = 0.1;

/// Longitudinal side of the ego vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanePosition {
    Front,
    Rear,
}

/// Lane relative to the ego vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneClass {
    Same,
    Left,
    Right,
}

impl LanePosition {
    pub fn contains(self, long_offset: f64) -> bool {
        match self {
            LanePosition::Front => long_offset >= 0.0,
            LanePosition::Rear => long_offset < 0.0,
        }
    }
}

impl LaneClass {
    /// Note the classes overlap exactly at `|lat| == 0.1`
    pub fn contains(self, lat_offset: f64) -> bool {
        match self {
            LaneClass::Same => lat_offset.abs() <= LANE_TOLERANCE,
            LaneClass::Left => lat_offset >= LANE_TOLERANCE,
            LaneClass::Right => lat_offset <= -LANE_TOLERANCE,
        }
    }
}

/// `(position, lane)` pair resolved against an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeQuery {
    pub position: LanePosition,
    pub lane: LaneClass,
}

impl RelativeQuery {
    pub fn new(position: LanePosition, lane: LaneClass) -> Self {
        Self { position, lane }
    }

    pub fn front(lane: LaneClass) -> Self {
        Self::new(LanePosition::Front, lane)
    }

    pub fn rear(lane: LaneClass) -> Self {
        Self::new(LanePosition::Rear, lane)
    }

    /// Whether a record satisfies both predicates (absent slots never do)
    pub fn matches(&self, record: &VehicleRecord) -> bool {
        record.present
            && self.position.contains(record.long_offset)
            && self.lane.contains(record.lat_offset)
    }
}

/// Why an observation could not be parsed
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObservationError {
    #[error("observation has no ego row")]
    Empty,

    #[error("row {row} has {len} features, expected at least 5")]
    ShortRow { row: usize, len: usize },

    #[error("row {row} contains a non-finite value")]
    NonFinite { row: usize },
}

/// Structured view over one kinematic observation
///
/// # Example
/// ```
/// use highway_overtake_core_rs::models::{Observation, RelativeQuery, LaneClass};
///
/// let rows = vec![
///     vec![1.0, 0.0, 0.0, 20.0, 0.0],  // ego
///     vec![1.0, 30.0, 0.0, 15.0, 0.0], // same lane, ahead
///     vec![0.0, 5.0, 0.0, 0.0, 0.0],   // empty slot
/// ];
/// let obs = Observation::parse(&rows).unwrap();
/// let front = obs.find(RelativeQuery::front(LaneClass::Same)).unwrap();
/// assert_eq!(front.long_offset, 30.0);
/// assert_eq!(obs.ego().unwrap().vx, 20.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    ego: Option<EgoState>,
    vehicles: Vec<VehicleRecord>,
}

impl Observation {
    /// Parse raw rows, reporting the first defect found
    pub fn parse<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, ObservationError> {
        let (ego_row, other_rows) = rows.split_first().ok_or(ObservationError::Empty)?;

        let ego_row = ego_row.as_ref();
        check_row(0, ego_row)?;
        if ego_row[..FEATURES_PER_VEHICLE].iter().any(|v| !v.is_finite()) {
            return Err(ObservationError::NonFinite { row: 0 });
        }
        let ego = EgoState {
            lat_offset: ego_row[2],
            vx: ego_row[3],
            vy: ego_row[4],
        };

        let mut vehicles = Vec::with_capacity(other_rows.len());
        for (i, row) in other_rows.iter().enumerate() {
            let row = row.as_ref();
            check_row(i + 1, row)?;
            let record = VehicleRecord::from_row(row);
            if record.present && row[1..FEATURES_PER_VEHICLE].iter().any(|v| !v.is_finite()) {
                return Err(ObservationError::NonFinite { row: i + 1 });
            }
            vehicles.push(record);
        }

        Ok(Self {
            ego: Some(ego),
            vehicles,
        })
    }

    /// Lenient constructor: malformed input yields an empty model
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        Self::parse(rows).unwrap_or_default()
    }

    /// Ego state, `None` when the observation was malformed
    pub fn ego(&self) -> Option<EgoState> {
        self.ego
    }

    /// All non-ego slots, present or not, in input order
    pub fn vehicles(&self) -> &[VehicleRecord] {
        &self.vehicles
    }

    /// Nearest present vehicle by `|long_offset|` matching the query
    ///
    /// Ties resolve to the earliest slot.
    pub fn find(&self, query: RelativeQuery) -> Option<&VehicleRecord> {
        let mut best: Option<&VehicleRecord> = None;
        for record in self.vehicles.iter().filter(|r| query.matches(r)) {
            match best {
                Some(current) if current.distance() <= record.distance() => {}
                _ => best = Some(record),
            }
        }
        best
    }

    /// Shorthand for [`find`](Self::find)
    pub fn find_at(&self, position: LanePosition, lane: LaneClass) -> Option<&VehicleRecord> {
        self.find(RelativeQuery::new(position, lane))
    }
}

fn check_row(row: usize, values: &[f64]) -> Result<(), ObservationError> {
    if values.len() < FEATURES_PER_VEHICLE {
        return Err(ObservationError::ShortRow {
            row,
            len: values.len(),
        });
    }
    Ok(())
}
