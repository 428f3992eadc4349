//! Discrete meta-action vocabulary shared by policies and the safety shield.
//!
//! The integer encoding matches the environment's discrete meta-action space
//! and must not be reordered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level driving decision for one policy step
///
/// # Example
/// ```
/// use highway_overtake_core_rs::DecisionAction;
///
/// assert_eq!(DecisionAction::LaneLeft.index(), 0);
/// assert_eq!(DecisionAction::try_from(3).unwrap(), DecisionAction::Faster);
/// assert!(DecisionAction::try_from(7).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DecisionAction {
    /// Change to the lane on the left
    LaneLeft = 0,
    /// Keep lane and speed
    Idle = 1,
    /// Change to the lane on the right
    LaneRight = 2,
    /// Accelerate
    Faster = 3,
    /// Decelerate
    Slower = 4,
}

/// Errors converting raw integers into actions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action index {0} outside 0..=4")]
    OutOfRange(i64),
}

impl DecisionAction {
    /// All actions in encoding order
    pub const ALL: [DecisionAction; 5] = [
        DecisionAction::LaneLeft,
        DecisionAction::Idle,
        DecisionAction::LaneRight,
        DecisionAction::Faster,
        DecisionAction::Slower,
    ];

    /// Integer encoding consumed by the environment
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Upper-case name used in logs and reports
    pub fn name(self) -> &'static str {
        match self {
            DecisionAction::LaneLeft => "LANE_LEFT",
            DecisionAction::Idle => "IDLE",
            DecisionAction::LaneRight => "LANE_RIGHT",
            DecisionAction::Faster => "FASTER",
            DecisionAction::Slower => "SLOWER",
        }
    }

    /// True for the two lateral maneuvers
    pub fn is_lane_change(self) -> bool {
        matches!(self, DecisionAction::LaneLeft | DecisionAction::LaneRight)
    }
}

impl TryFrom<i64> for DecisionAction {
    type Error = ActionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(ActionError::OutOfRange(value))
    }
}

impl From<DecisionAction> for i64 {
    fn from(action: DecisionAction) -> Self {
        action.index() as i64
    }
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
