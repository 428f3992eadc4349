//! SafetyShield Integration Tests
//!
//! Override rules, intervention bookkeeping, fail-closed handling and the
//! shield wrapped around arbitrary decision sources.

use highway_overtake_core_rs::policy::{DecisionSource, FnDecisionSource, RuleBasedPolicy};
use highway_overtake_core_rs::shield::{
    intervention_rate, InterventionReason, SafetyShield, ShieldedPolicy,
};
use highway_overtake_core_rs::{DecisionAction, EvaluationConfig};
use proptest::prelude::*;

fn ego(lat: f64, vx: f64) -> Vec<f64> {
    vec![1.0, 0.0, lat, vx, 0.0]
}

fn car(long: f64, lat: f64, vx: f64) -> Vec<f64> {
    vec![1.0, long, lat, vx, 0.0]
}

fn shield() -> SafetyShield {
    SafetyShield::new(&EvaluationConfig::default())
}

#[test]
fn test_unsafe_left_change_counts_one_left_intervention() {
    let mut shield = shield();
    let obs = vec![ego(0.0, 20.0), car(10.0, 4.0, 20.0)];

    assert_eq!(
        shield.check_and_correct(&obs, DecisionAction::LaneLeft),
        (DecisionAction::Idle, true)
    );

    let stats = shield.statistics();
    assert_eq!(stats.total_checks, 1);
    assert_eq!(stats.total_interventions, 1);
    assert_eq!(stats.intervention_reasons.get(InterventionReason::UnsafeLaneChangeLeft), 1);
    assert_eq!(stats.intervention_reasons.get(InterventionReason::UnsafeLaneChangeRight), 0);
    assert_eq!(stats.intervention_reasons.get(InterventionReason::TooCloseFront), 0);
    assert_eq!(stats.fail_closed, 0);
}

#[test]
fn test_unsafe_right_change_uses_rear_gap() {
    let mut shield = shield();
    let obs = vec![ego(4.0, 30.0), car(-10.0, -4.0, 30.0)];
    let outcome = shield.evaluate(&obs, DecisionAction::LaneRight);
    assert_eq!(outcome.action, DecisionAction::Idle);
    assert_eq!(outcome.reason, Some(InterventionReason::UnsafeLaneChangeRight));
}

#[test]
fn test_faster_uses_wider_margin_than_policy() {
    let mut shield = shield();
    // 20 ahead: the policy's 15 would allow it, 1.5 × 15 = 22.5 does not
    let close = vec![ego(0.0, 20.0), car(20.0, 0.0, 25.0)];
    assert_eq!(
        shield.check_and_correct(&close, DecisionAction::Faster),
        (DecisionAction::Idle, true)
    );

    let far = vec![ego(0.0, 20.0), car(22.5, 0.0, 25.0)];
    assert_eq!(
        shield.check_and_correct(&far, DecisionAction::Faster),
        (DecisionAction::Faster, false)
    );
    assert_eq!(
        shield.statistics().intervention_reasons.get(InterventionReason::TooCloseFront),
        1
    );
}

#[test]
fn test_idle_and_slower_always_pass() {
    let mut shield = shield();
    let crowded = vec![ego(0.0, 20.0), car(1.0, 0.0, 0.0), car(-1.0, 4.0, 40.0)];
    for action in [DecisionAction::Idle, DecisionAction::Slower] {
        assert_eq!(shield.check_and_correct(&crowded, action), (action, false));
    }
    assert_eq!(shield.statistics().total_interventions, 0);
    assert_eq!(shield.statistics().total_checks, 2);
}

#[test]
fn test_malformed_observation_fails_closed() {
    let mut shield = shield();
    assert_eq!(
        shield.check_and_correct(&[vec![1.0, 0.0]], DecisionAction::Faster),
        (DecisionAction::Idle, true)
    );
    assert_eq!(
        shield.check_and_correct(&[], DecisionAction::Idle),
        (DecisionAction::Idle, true)
    );

    let stats = shield.statistics();
    assert_eq!(stats.total_checks, 2);
    assert_eq!(stats.total_interventions, 2);
    assert_eq!(stats.fail_closed, 2);
    assert_eq!(stats.intervention_reasons.total(), 0);
}

#[test]
fn test_out_of_range_action_index_fails_closed() {
    let mut shield = shield();
    let obs = vec![ego(0.0, 20.0)];
    assert_eq!(shield.check_and_correct_index(&obs, 7), (DecisionAction::Idle, true));
    assert_eq!(shield.check_and_correct_index(&obs, -1), (DecisionAction::Idle, true));
    assert_eq!(shield.check_and_correct_index(&obs, 3), (DecisionAction::Faster, false));
    assert_eq!(shield.statistics().fail_closed, 2);
    assert_eq!(shield.statistics().total_checks, 3);
}

#[test]
fn test_rate_and_reset() {
    let mut shield = shield();
    let unsafe_left = vec![ego(0.0, 20.0), car(5.0, 4.0, 20.0)];
    shield.check_and_correct(&unsafe_left, DecisionAction::LaneLeft);
    for _ in 0..3 {
        shield.check_and_correct(&unsafe_left, DecisionAction::Idle);
    }
    assert_eq!(shield.statistics().intervention_rate, 25.0);

    shield.reset();
    let stats = shield.statistics();
    assert_eq!(stats.total_checks, 0);
    assert_eq!(stats.total_interventions, 0);
    assert_eq!(stats.intervention_rate, 0.0);
    assert_eq!(stats.intervention_reasons.total(), 0);
}

#[test]
fn test_intervention_rate_formula() {
    assert_eq!(intervention_rate(0, 0), 0.0);
    assert_eq!(intervention_rate(3, 0), 0.0);
    assert_eq!(intervention_rate(1, 4), 25.0);
    assert_eq!(intervention_rate(4, 4), 100.0);
}

#[test]
fn test_shielded_policy_name_and_reset() {
    let config = EvaluationConfig::default();
    let mut shielded = ShieldedPolicy::new(RuleBasedPolicy::new(&config), SafetyShield::new(&config));
    assert_eq!(shielded.name(), "baseline_safety");

    // The baseline wants FASTER; the shield blocks it with a car 20 ahead
    let obs = vec![ego(0.0, 20.0), car(20.0, 0.0, 26.0)];
    assert_eq!(shielded.propose(&obs), DecisionAction::Idle);
    assert!(shielded.last_corrected());

    // Reset clears the policy but statistics keep accumulating
    shielded.reset();
    assert!(!shielded.last_corrected());
    assert_eq!(shielded.statistics().total_checks, 1);
    assert_eq!(shielded.statistics().total_interventions, 1);
}

#[test]
fn test_shield_filters_learned_policy() {
    let config = EvaluationConfig::default();
    let reckless = FnDecisionSource::new("ppo", |_obs: &[Vec<f64>]| DecisionAction::LaneRight);
    let mut shielded = ShieldedPolicy::new(reckless, SafetyShield::new(&config));

    let blocked = vec![ego(4.0, 25.0), car(3.0, -4.0, 25.0)];
    let clear = vec![ego(4.0, 25.0)];
    assert_eq!(shielded.propose(&blocked), DecisionAction::Idle);
    assert_eq!(shielded.propose(&clear), DecisionAction::LaneRight);

    let (_, shield) = shielded.into_parts();
    assert_eq!(shield.statistics().total_checks, 2);
}

fn any_row() -> impl Strategy<Value = Vec<f64>> {
    (0.0..1.0f64, -60.0..60.0f64, -8.0..8.0f64, 0.0..40.0f64)
        .prop_map(|(p, long, lat, vx)| vec![p, long, lat, vx, 0.0])
}

#[test]
fn test_policy_and_shield_share_envelope() {
    let mut config = EvaluationConfig::default();
    config.safety.min_safe_distance = 18.0;
    config.safety.min_time_headway = 2.0;
    let policy = RuleBasedPolicy::new(&config);
    let shield = SafetyShield::new(&config);
    assert_eq!(policy.envelope(), shield.envelope());
    assert_eq!(shield.envelope().min_safe_distance, 18.0);
}

proptest! {
    #[test]
    fn prop_policy_lane_change_matches_shield_verdict(
        vx in 15.0..35.0f64,
        left in prop::collection::vec((-60.0..60.0f64, 10.0..35.0f64), 0..4),
    ) {
        // Slow car 30 ahead triggers an overtake; only the left lane varies
        let mut obs = vec![ego(0.0, vx), car(30.0, 0.0, 15.0)];
        obs.extend(left.iter().map(|&(long, v)| car(long, 4.0, v)));

        let mut policy = RuleBasedPolicy::new(&EvaluationConfig::default());
        let mut shield = shield();
        let policy_changes = policy.propose(&obs) == DecisionAction::LaneLeft;
        let (_, corrected) = shield.check_and_correct(&obs, DecisionAction::LaneLeft);
        prop_assert_eq!(policy_changes, !corrected);
    }

    #[test]
    fn prop_counters_stay_consistent(
        steps in prop::collection::vec(
            (prop::collection::vec(any_row(), 0..6), 0i64..7, 15.0..35.0f64, any::<bool>()),
            1..50,
        )
    ) {
        let mut shield = shield();
        for (others, index, vx, truncate) in steps {
            let mut obs = vec![ego(0.0, vx)];
            obs.extend(others);
            if truncate {
                obs[0].truncate(3);
            }
            let (action, corrected) = shield.check_and_correct_index(&obs, index);
            if corrected {
                prop_assert_eq!(action, DecisionAction::Idle);
            }
        }
        let stats = shield.statistics();
        prop_assert!(stats.total_interventions <= stats.total_checks);
        prop_assert_eq!(
            stats.intervention_reasons.total() + stats.fail_closed,
            stats.total_interventions
        );
        prop_assert!((0.0..=100.0).contains(&stats.intervention_rate));
    }
}
