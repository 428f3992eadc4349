//! OutcomeTracker Integration Tests
//!
//! Overtaking state machine, one-time bonus, violations and episode records.

use highway_overtake_core_rs::models::{RoadSnapshot, VehicleId, VehicleSnapshot};
use highway_overtake_core_rs::tracker::{OutcomeTracker, RewardBreakdown, StepFeedback};
use highway_overtake_core_rs::EvaluationConfig;
use proptest::prelude::*;

const TARGET_X: f64 = 100.0;

fn road(ego_x: f64) -> RoadSnapshot {
    RoadSnapshot {
        ego: VehicleSnapshot::new(0, [ego_x, 0.0], [28.0, 0.0]),
        others: vec![
            VehicleSnapshot::new(7, [TARGET_X, 4.0], [20.0, 0.0]),
            VehicleSnapshot::new(8, [400.0, 8.0], [30.0, 0.0]),
        ],
    }
}

fn obs() -> Vec<Vec<f64>> {
    vec![vec![1.0, 0.0, 0.0, 28.0, 0.0]]
}

fn tracker(maintain_steps: usize) -> OutcomeTracker {
    let mut config = EvaluationConfig::default();
    config.overtaking_success.maintain_steps = maintain_steps;
    OutcomeTracker::new(&config)
}

#[test]
fn test_target_is_slow_vehicle_ahead() {
    let mut tracker = tracker(30);
    tracker.start_episode(&road(0.0), 0, None);
    assert_eq!(tracker.target(), Some(VehicleId(7)));
}

#[test]
fn test_no_target_never_completes() {
    let mut tracker = tracker(1);
    let empty = RoadSnapshot {
        ego: VehicleSnapshot::new(0, [0.0, 0.0], [25.0, 0.0]),
        others: vec![VehicleSnapshot::new(1, [-30.0, 0.0], [10.0, 0.0])],
    };
    tracker.start_episode(&empty, 0, None);
    assert_eq!(tracker.target(), None);

    for _ in 0..10 {
        let info = tracker.observe_step(&obs(), &StepFeedback::default(), &empty);
        assert!(!info.overtaking_complete);
    }
    assert!(!tracker.finish().overtaking_complete);
}

#[test]
fn test_bonus_awarded_once_on_completion_step() {
    let mut tracker = tracker(3);
    tracker.start_episode(&road(0.0), 0, None);

    // Far enough ahead that the target is outside the safe distance
    let ahead = road(TARGET_X + 30.0);
    let bonuses: Vec<f64> = (0..8)
        .map(|_| {
            tracker
                .observe_step(&obs(), &StepFeedback::default(), &ahead)
                .reward_components
                .overtaking_success
        })
        .collect();

    assert_eq!(bonuses, vec![0.0, 0.0, 50.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(tracker.bonus_awarded());
    assert_eq!(tracker.total_reward(), 50.0);
}

#[test]
fn test_steps_ahead_resets_when_falling_behind() {
    let mut tracker = tracker(5);
    tracker.start_episode(&road(0.0), 0, None);
    let fb = StepFeedback::default();

    for _ in 0..4 {
        tracker.observe_step(&obs(), &fb, &road(TARGET_X + 1.0));
    }
    assert_eq!(tracker.steps_ahead(), 4);

    // Level with the target is not ahead
    tracker.observe_step(&obs(), &fb, &road(TARGET_X));
    assert_eq!(tracker.steps_ahead(), 0);
    assert!(!tracker.overtaking_complete());
    assert!(tracker.overtaking_started());
}

#[test]
fn test_completion_is_monotonic() {
    let mut tracker = tracker(2);
    tracker.start_episode(&road(0.0), 0, None);
    let fb = StepFeedback::default();
    tracker.observe_step(&obs(), &fb, &road(TARGET_X + 5.0));
    tracker.observe_step(&obs(), &fb, &road(TARGET_X + 5.0));
    assert!(tracker.overtaking_complete());

    let info = tracker.observe_step(&obs(), &fb, &road(0.0));
    assert!(info.overtaking_complete);
    assert_eq!(tracker.steps_ahead(), 2);
}

#[test]
fn test_shaped_reward_and_violation() {
    let mut tracker = tracker(30);
    tracker.start_episode(&road(0.0), 0, None);

    // Target about 14.6 away diagonally: sqrt(14^2 + 4^2) < 15
    let close = road(TARGET_X - 14.0);
    let fb = StepFeedback {
        rewards: RewardBreakdown {
            high_speed_reward: Some(0.8),
            right_lane_reward: Some(1.0),
            on_road_reward: Some(1.0),
        },
        crashed: false,
    };
    let info = tracker.observe_step(&obs(), &fb, &close);
    assert!(info.violation);
    assert_eq!(info.violation_count, 1);
    let expected = 0.8 * 0.4 + 0.1 + 1.0 - 10.0;
    assert!((info.reward - expected).abs() < 1e-9);

    let far = road(TARGET_X - 40.0);
    let info = tracker.observe_step(&obs(), &fb, &far);
    assert!(!info.violation);
    assert_eq!(info.violation_count, 1);
    assert_eq!(tracker.finish().total_violations, 1);
}

#[test]
fn test_start_episode_clears_previous_state() {
    let mut tracker = tracker(1);
    tracker.start_episode(&road(0.0), 0, Some(1));
    let crash = StepFeedback {
        crashed: true,
        ..StepFeedback::default()
    };
    tracker.observe_step(&obs(), &crash, &road(TARGET_X + 1.0));
    assert!(tracker.finish().collision_occurred);

    tracker.start_episode(&road(0.0), 1, Some(2));
    let outcome = tracker.finish();
    assert_eq!(outcome.episode, 1);
    assert_eq!(outcome.seed, Some(2));
    assert_eq!(outcome.episode_length, 0);
    assert!(!outcome.collision_occurred);
    assert!(!outcome.overtaking_complete);
    assert_eq!(outcome.avg_speed, 0.0);
}

proptest! {
    #[test]
    fn prop_bonus_at_most_once(
        positions in prop::collection::vec(0.0..200.0f64, 1..120),
        maintain in 1usize..10,
    ) {
        let mut tracker = tracker(maintain);
        tracker.start_episode(&road(0.0), 0, None);
        let mut bonus_steps = 0;
        let mut run = 0usize;
        for x in positions {
            run = if x > TARGET_X { run + 1 } else { 0 };
            let info = tracker.observe_step(&obs(), &StepFeedback::default(), &road(x));
            if info.reward_components.overtaking_success != 0.0 {
                bonus_steps += 1;
                prop_assert!(info.overtaking_complete);
                prop_assert_eq!(run, maintain);
            }
        }
        prop_assert!(bonus_steps <= 1);
        prop_assert_eq!(bonus_steps == 1, tracker.overtaking_complete());
    }
}
