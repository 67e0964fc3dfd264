use mcs_core::{NodeRef, RealParameter, RngHandle, State, StateNode};
use mcs_mcmc::{
    AdaptationTransform, BactrianRandomWalkOperator, KernelDistribution, Operator,
    RandomWalkSettings, Tunable,
};
use proptest::prelude::*;

/// Kernel that always moves by the same amount.
struct FixedDelta(f64);

impl KernelDistribution for FixedDelta {
    fn random_delta(&mut self, _dim: usize, _value: f64, _scale: f64, _rng: &mut RngHandle) -> f64 {
        self.0
    }
}

fn unit_interval_state(value: f64) -> State {
    State::from_nodes([StateNode::real(
        "p",
        RealParameter::with_bounds(vec![value], 0.0, 1.0).unwrap(),
    )])
    .unwrap()
}

fn value(reference: &NodeRef) -> f64 {
    reference
        .with(|node| node.as_real().unwrap().value(0).unwrap())
        .unwrap()
}

fn operator(state: &State, settings: &RandomWalkSettings) -> BactrianRandomWalkOperator {
    BactrianRandomWalkOperator::with_default_kernel("rw", state.node_ref("parameter", "p").unwrap(), settings)
        .unwrap()
}

#[test]
fn out_of_bounds_proposal_is_impossible_and_restorable() {
    let mut state = unit_interval_state(0.99);
    let mut op = BactrianRandomWalkOperator::new(
        "rw",
        state.node_ref("parameter", "p").unwrap(),
        Box::new(FixedDelta(0.5)),
        &RandomWalkSettings::default(),
    )
    .unwrap();
    state.connect(&op);
    let mut rng = RngHandle::from_seed(1);

    state.store().unwrap();
    let hastings = op.proposal(&mut rng).unwrap();
    assert_eq!(hastings, f64::NEG_INFINITY);
    state.restore().unwrap();
    op.reject();

    assert_eq!(value(op.parameter()), 0.99);
    assert_eq!(op.stats().rejected, 1);
}

#[test]
fn in_bounds_proposal_moves_exactly_one_dimension() {
    let mut state = State::from_nodes([StateNode::real(
        "v",
        RealParameter::new(vec![0.0, 0.0, 0.0]),
    )])
    .unwrap();
    let mut op = BactrianRandomWalkOperator::new(
        "rw",
        state.node_ref("parameter", "v").unwrap(),
        Box::new(FixedDelta(0.25)),
        &RandomWalkSettings::default(),
    )
    .unwrap();
    state.connect(&op);
    let mut rng = RngHandle::from_seed(2);

    state.store().unwrap();
    assert_eq!(op.proposal(&mut rng).unwrap(), 0.0);
    let values = op
        .parameter()
        .with(|node| node.as_real().unwrap().values().to_vec())
        .unwrap();
    assert_eq!(values.iter().filter(|&&x| x == 0.25).count(), 1);
    assert_eq!(values.iter().filter(|&&x| x == 0.0).count(), 2);
    assert!(state.is_dirty(0));

    state.restore().unwrap();
    let restored = op
        .parameter()
        .with(|node| node.as_real().unwrap().values().to_vec())
        .unwrap();
    assert_eq!(restored, vec![0.0, 0.0, 0.0]);
}

#[test]
fn window_grows_after_acceptance_and_shrinks_after_rejection() {
    let state = unit_interval_state(0.5);
    let mut op = operator(&state, &RandomWalkSettings::default());
    assert_eq!(op.window_size(), 1.0);

    op.accept();
    op.optimize(0.0);
    let grown = op.window_size();
    assert!((grown - (0.7 / 2f64.sqrt()).exp()).abs() < 1e-12);

    op.reject();
    op.optimize(f64::NEG_INFINITY);
    let shrunk = op.window_size();
    assert!(shrunk < grown);
    assert!((shrunk - grown * (-0.3 / 3f64.sqrt()).exp()).abs() < 1e-12);

    for _ in 0..1_000 {
        op.reject();
        op.optimize(f64::NEG_INFINITY);
        assert!(op.window_size() > 0.0);
    }
}

#[test]
fn disabled_optimisation_keeps_window_fixed() {
    let state = unit_interval_state(0.5);
    let settings = RandomWalkSettings {
        window_size: Some(0.2),
        optimise: false,
        ..RandomWalkSettings::default()
    };
    let mut op = operator(&state, &settings);
    op.accept();
    op.optimize(0.0);
    assert_eq!(op.window_size(), 0.2);
}

#[test]
fn transforms_damp_the_step_differently() {
    let state = unit_interval_state(0.5);
    let grown = |transform| {
        let settings = RandomWalkSettings {
            transform,
            ..RandomWalkSettings::default()
        };
        let mut op = operator(&state, &settings);
        for _ in 0..10 {
            op.accept();
        }
        op.optimize(0.0);
        op.window_size().ln()
    };
    let none = grown(AdaptationTransform::None);
    let log = grown(AdaptationTransform::Log);
    let sqrt = grown(AdaptationTransform::Sqrt);
    assert!((none - 0.7 / 11.0).abs() < 1e-12);
    assert!((log - 0.7 / 12f64.ln()).abs() < 1e-12);
    assert!((sqrt - 0.7 / 11f64.sqrt()).abs() < 1e-12);
}

#[test]
fn window_options_are_mutually_exclusive() {
    let state = unit_interval_state(0.5);
    let settings = RandomWalkSettings {
        scale_factor: Some(2.0),
        window_size: Some(3.0),
        ..RandomWalkSettings::default()
    };
    let err = BactrianRandomWalkOperator::with_default_kernel(
        "rw",
        state.node_ref("parameter", "p").unwrap(),
        &settings,
    )
    .err()
    .unwrap();
    assert!(err.is_config());
    assert_eq!(err.info().code, "exclusive-window-options");

    let legacy = RandomWalkSettings {
        scale_factor: Some(2.0),
        ..RandomWalkSettings::default()
    };
    assert_eq!(operator(&state, &legacy).window_size(), 2.0);

    let invalid = RandomWalkSettings {
        window_size: Some(-1.0),
        ..RandomWalkSettings::default()
    };
    assert_eq!(invalid.resolve_window_size().unwrap_err().info().code, "invalid-window-size");
}

#[test]
fn non_real_targets_are_rejected() {
    let state = State::from_nodes([StateNode::integer(
        "k",
        mcs_core::IntegerParameter::new(vec![1]),
    )])
    .unwrap();
    let err = BactrianRandomWalkOperator::with_default_kernel(
        "rw",
        state.node_ref("parameter", "k").unwrap(),
        &RandomWalkSettings::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.info().code, "parameter-kind");

    let err = BactrianRandomWalkOperator::with_default_kernel(
        "rw",
        NodeRef::unbound("parameter"),
        &RandomWalkSettings::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.info().code, "unbound-reference");
}

#[test]
fn suggestion_appears_only_outside_comfort_band() {
    let state = unit_interval_state(0.5);
    let mut op = operator(&state, &RandomWalkSettings::default());
    assert_eq!(op.performance_suggestion(), "");

    op.stats_mut().accepted = 5;
    op.stats_mut().rejected = 95;
    assert_eq!(op.performance_suggestion(), "Try setting scale factor to about 0.5");

    op.stats_mut().accepted = 30;
    op.stats_mut().rejected = 70;
    assert_eq!(op.performance_suggestion(), "");

    op.stats_mut().accepted = 90;
    op.stats_mut().rejected = 10;
    assert_eq!(op.performance_suggestion(), "Try setting scale factor to about 2");
}

#[test]
fn tunable_exposes_window_size() {
    let state = unit_interval_state(0.5);
    let mut op = operator(&state, &RandomWalkSettings::default());
    assert_eq!(op.target_acceptance_probability(), 0.3);
    op.tunable_mut().unwrap().set_coercable_parameter_value(0.125);
    assert_eq!(op.window_size(), 0.125);
    assert_eq!(op.tunable().unwrap().coercable_parameter_value(), 0.125);
    assert_eq!(Tunable::coercable_parameter_value(&op), 0.125);
}

#[test]
fn persistent_high_acceptance_trends_window_upward() {
    let state = unit_interval_state(0.5);
    let mut op = operator(&state, &RandomWalkSettings::default());
    let start = op.window_size();
    // alpha = 0.6 sits above the 0.3 target whether or not the move is kept
    let log_alpha = 0.6f64.ln();
    let mut previous = start;
    for round in 0..500 {
        if round % 2 == 0 {
            op.accept();
        } else {
            op.reject();
        }
        op.optimize(log_alpha);
        assert!(op.window_size() > previous);
        previous = op.window_size();
    }
    assert!(op.window_size() > 2.0 * start);

    let mut previous = op.window_size();
    for _ in 0..500 {
        op.reject();
        op.optimize(0.1f64.ln());
        assert!(op.window_size() < previous);
        previous = op.window_size();
    }
}

fn transform_strategy() -> impl Strategy<Value = AdaptationTransform> {
    prop_oneof![
        Just(AdaptationTransform::None),
        Just(AdaptationTransform::Log),
        Just(AdaptationTransform::Sqrt),
    ]
}

fn log_alpha_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NEG_INFINITY),
        Just(f64::NAN),
        -50.0f64..5.0,
    ]
}

proptest! {
    #[test]
    fn window_stays_positive_under_any_decision_sequence(
        transform in transform_strategy(),
        start in 0.001f64..100.0,
        decisions in proptest::collection::vec((any::<bool>(), log_alpha_strategy()), 1..200),
    ) {
        let state = unit_interval_state(0.5);
        let settings = RandomWalkSettings {
            window_size: Some(start),
            transform,
            ..RandomWalkSettings::default()
        };
        let mut op = operator(&state, &settings);
        for (accepted, log_alpha) in decisions {
            if accepted {
                op.accept();
            } else {
                op.reject();
            }
            op.optimize(log_alpha);
            prop_assert!(op.window_size().is_finite());
            prop_assert!(op.window_size() > 0.0);
        }
    }
}
