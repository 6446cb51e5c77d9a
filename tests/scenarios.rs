//! End-to-end scenarios from `spec.md` §8, one `#[test]` per scenario,
//! named for what they exercise rather than their position in that list.

use approx::assert_abs_diff_eq;
use relsim::{Action, Engine, EventFilter, ObjId, SimConfig, Vector3, Vector4};
use rstest::rstest;

fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

#[rstest]
#[case(0.0)]
#[case(0.3)]
#[case(0.9)]
fn trivial_inertial_object_advances_straight_with_no_events(#[case] v: f64) {
    init_logging();
    let mut engine = Engine::with_config(SimConfig::with_eps(1e-3));
    let ship = engine.add_object("ship", Vector4::zeros(), Vector3::new(v, 0.0, 0.0), 0.0);
    engine.simulate_to(1.0).unwrap();

    assert!(engine.events().is_empty());
    let s = engine.state(&ship).unwrap();
    let gamma = 1.0 / (1.0 - v * v).sqrt();
    assert_abs_diff_eq!(s.r[0], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(s.r[1], v, epsilon = 1e-9);
    assert_abs_diff_eq!(s.tau, 1.0 / gamma, epsilon = 1e-6);
}

#[test]
fn marker_on_a_moving_object_fires_at_the_analytically_expected_place() {
    init_logging();
    let mut engine = Engine::with_config(SimConfig::with_eps(1e-3));
    let ship = engine.add_object("ship", Vector4::zeros(), Vector3::new(0.5, 0.0, 0.0), 0.0);
    engine.add_action(&ship, Action::marker("halfway", 0.5)).unwrap();
    engine.simulate_to(1.0).unwrap();

    assert_eq!(engine.events().len(), 1);
    let gamma = 1.0 / (1.0 - 0.25f64).sqrt();
    let ev = &engine.events()[0];
    assert_abs_diff_eq!(ev.sender_state.r[0], 0.5 * gamma, epsilon = 1e-3);
    assert_abs_diff_eq!(ev.sender_state.r[1], 0.25 * gamma, epsilon = 1e-3);

    let final_state = engine.state(&ship).unwrap();
    assert_abs_diff_eq!(final_state.r[0], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(final_state.r[1], 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(final_state.tau, 1.0 / gamma, epsilon = 1e-3);
}

#[test]
fn pulse_reaches_a_stationary_receiver_on_its_lightcone() {
    init_logging();
    let mut engine = Engine::with_config(SimConfig::with_eps(1e-3));
    let sender = engine.add_object("sender", Vector4::zeros(), Vector3::zeros(), 0.0);
    let receiver = engine.add_object("receiver", Vector4::new(0.0, 1.0, 0.0, 0.0), Vector3::zeros(), 0.0);
    engine.add_action(&sender, Action::pulse("beep", 0.0)).unwrap();
    engine.simulate_to(2.0).unwrap();

    let receptions = engine.query_events(&EventFilter::new().name("beep").receiver(receiver.clone()));
    assert_eq!(receptions.len(), 1);
    let ev = receptions[0];
    assert_eq!(&ev.sender_obj, &sender);
    assert_abs_diff_eq!(ev.receiver_state.r[0], 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(ev.receiver_state.r[1], 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(ev.receiver_state.tau, 1.0, epsilon = 1e-3);
}

#[test]
fn hyperbolic_rocket_matches_the_closed_form_after_unit_proper_time() {
    init_logging();
    let mut engine = Engine::with_config(SimConfig::with_eps(1e-3));
    let rocket = engine.add_object("rocket", Vector4::zeros(), Vector3::zeros(), 0.0);
    engine
        .add_motion(
            &rocket,
            relsim::Motion::LongitudinalAcceleration {
                tau_start: 0.0,
                tau_end: f64::INFINITY,
                a: Vector3::new(1.0, 0.0, 0.0),
            },
        )
        .unwrap();
    engine.add_action(&rocket, Action::marker("checkpoint", 1.0)).unwrap();
    engine.simulate_to(5.0).unwrap();

    let ev = engine.query_events(&EventFilter::new().name("Action"));
    assert_eq!(ev.len(), 1);
    let s = ev[0].sender_state;
    assert_abs_diff_eq!(s.r[0], 1f64.sinh(), epsilon = 1e-3);
    assert_abs_diff_eq!(s.r[1], 1f64.cosh() - 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(s.v.x, 1f64.tanh(), epsilon = 1e-3);
}

#[test]
fn accelerated_twin_returns_younger_than_the_stay_at_home_twin() {
    init_logging();
    let mut engine = Engine::with_config(SimConfig::with_eps(1e-3));

    let old = engine.add_object("twinOld", Vector4::zeros(), Vector3::zeros(), 0.0);
    let young = engine.add_object("twinYoung", Vector4::zeros(), Vector3::zeros(), 0.0);

    // Classic symmetric three-segment profile: accelerate away for 4
    // proper-time units, decelerate-and-return over 8 (the same
    // continuous acceleration first cancels the outbound velocity, then
    // builds an equal inbound one), decelerate to a stop over a final 4 —
    // 4 + 8 + 4 = 16 proper-time units total, ending back at rest at the
    // spatial origin.
    engine
        .add_motion(
            &young,
            relsim::Motion::LongitudinalAcceleration {
                tau_start: 0.0,
                tau_end: 4.0,
                a: Vector3::new(1.0, 0.0, 0.0),
            },
        )
        .unwrap();
    engine
        .add_motion(
            &young,
            relsim::Motion::LongitudinalAcceleration {
                tau_start: 4.0,
                tau_end: 12.0,
                a: Vector3::new(-1.0, 0.0, 0.0),
            },
        )
        .unwrap();
    engine
        .add_motion(
            &young,
            relsim::Motion::LongitudinalAcceleration {
                tau_start: 12.0,
                tau_end: 16.0,
                a: Vector3::new(1.0, 0.0, 0.0),
            },
        )
        .unwrap();

    engine
        .add_action(&young, Action::detect_collision("reunion", 4.0, f64::INFINITY, vec![old.clone()]))
        .unwrap();

    engine.simulate_to(110.0).unwrap();

    let collisions = engine.query_events(&EventFilter::new().name("collide"));
    assert!(!collisions.is_empty(), "twinYoung never reunites with twinOld");

    let tau_old = engine.state(&old).unwrap().tau;
    let tau_young = engine.state(&young).unwrap().tau;
    assert!(
        tau_old > 6.0 * tau_young,
        "expected the stay-at-home twin to have aged much more: old={tau_old} young={tau_young}"
    );
}

#[test]
fn accelerating_receiver_sees_growing_gaps_between_sender_pulses() {
    init_logging();
    let mut engine = Engine::with_config(SimConfig::with_eps(1e-4));

    let bottom = engine.add_object("bottom", Vector4::zeros(), Vector3::zeros(), 0.0);
    let top = engine.add_object("top", Vector4::new(0.0, 1.0, 0.0, 0.0), Vector3::zeros(), 0.0);

    for obj in [&bottom, &top] {
        engine
            .add_motion(
                obj,
                relsim::Motion::LongitudinalAcceleration {
                    tau_start: 0.0,
                    tau_end: f64::INFINITY,
                    a: Vector3::new(0.1, 0.0, 0.0),
                },
            )
            .unwrap();
    }

    engine.add_action(&bottom, Action::sender("A", 0.0, 1.0)).unwrap();
    engine.simulate_to(10.0).unwrap();

    let receptions = engine.query_events(&EventFilter::new().name("A").receiver(top.clone()));
    assert!(receptions.len() >= 2, "need at least two receptions to compare gaps");

    let taus: Vec<f64> = receptions.iter().map(|e| e.receiver_state.tau).collect();
    let gaps: Vec<f64> = taus.windows(2).map(|w| w[1] - w[0]).collect();

    for &gap in &gaps {
        assert!(gap > 1.0 - 1e-3, "expected a redshifted (>1 proper-time-unit) gap, got {gap}");
    }
    for pair in gaps.windows(2) {
        assert!(
            pair[1] >= pair[0] - 1e-3,
            "expected non-decreasing gaps as both objects keep accelerating: {:?}",
            gaps
        );
    }
}

#[test]
fn query_events_filters_compose_across_name_and_receiver() {
    init_logging();
    let mut engine = Engine::new();
    let a = engine.add_object("a", Vector4::zeros(), Vector3::zeros(), 0.0);
    engine.add_action(&a, Action::marker("one", 1.0)).unwrap();
    engine.add_action(&a, Action::marker("two", 2.0)).unwrap();
    engine.simulate_to(3.0).unwrap();

    let all: Vec<_> = engine.query_events(&EventFilter::new().name("Action"));
    assert_eq!(all.len(), 2);

    let by_time: Vec<_> = engine.query_events(&EventFilter::new().name("Action").time_range(0.0, 1.5));
    assert_eq!(by_time.len(), 1);

    let none: Vec<_> = engine.query_events(&EventFilter::new().sender(ObjId::new("nonexistent")));
    assert!(none.is_empty());
}
