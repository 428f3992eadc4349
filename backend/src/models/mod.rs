//! Domain models for the decision layer

pub mod action;
pub mod envelope;
pub mod episode;
pub mod observation;
pub mod vehicle;

// Re-exports
pub use action::{ActionError, DecisionAction};
pub use envelope::{LaneChangeAssessment, SafetyEnvelope};
pub use episode::EpisodeOutcome;
pub use observation::{
    LaneClass, LanePosition, Observation, ObservationError, RelativeQuery, LANE_TOLERANCE,
};
pub use vehicle::{
    EgoState, RoadSnapshot, VehicleId, VehicleRecord, VehicleSnapshot, FEATURES_PER_VEHICLE,
};
