//! Reference piston-valve scenario, end to end.

use pf_sim::{
    IntegrationOptions, IntegratorType, PhysicalParameters, RunConfig, SimError, SimOptions,
    SimulationState, TimeSpan, Trajectory, simulate, simulate_with, sweep_valve_openings,
};

fn reference_run(integrator: IntegratorType) -> Trajectory {
    let span = TimeSpan::new(0.0, 0.02).unwrap();
    let samples = span.evenly_spaced(200);
    simulate_with(
        span,
        &samples,
        SimulationState::new(0.0, 0.0, 1.0e5, 1.0e5),
        &PhysicalParameters::default(),
        &SimOptions::with_integrator(integrator),
    )
    .unwrap()
}

fn check_reference_shape(traj: &Trajectory) {
    assert_eq!(traj.len(), 200);
    assert!(traj.iter().all(|s| s.state.is_finite()));
    assert_eq!(traj.times(), TimeSpan::default().evenly_spaced(200));

    // Positive pressure difference pushes the piston forward at every sample
    let x = traj.positions();
    assert_eq!(x[0], 0.0);
    for (i, w) in x.windows(2).enumerate() {
        assert!(w[1] > w[0], "position not increasing at sample {}", i + 1);
    }

    // Chamber 1 fills from supply
    let p1 = traj.pressure1();
    assert_eq!(p1[0], 1.0e5);
    for (i, w) in p1.windows(2).enumerate() {
        assert!(w[1] > w[0], "pressure1 not increasing at sample {}", i + 1);
    }
    let expected_rise = 0.002 * 2.0e-5 * (1.4e7 - 1.0e5) / 850.0 * 0.02;
    assert!(((p1[199] - p1[0]) - expected_rise).abs() < 1e-3 * expected_rise);

    // Chamber 2 starts at ambient and stays there
    let ambient = PhysicalParameters::default().ambient_pressure;
    assert!(traj.pressure2().iter().all(|p| (p - ambient).abs() <= 1e-6));
}

#[test]
fn reference_scenario_with_stiff_integrator() {
    let traj = reference_run(IntegratorType::Sdirk21);
    check_reference_shape(&traj);

    let stats = traj.stats();
    assert!(stats.accepted_steps > 0);
    assert!(stats.jacobian_evals > 0);
}

#[test]
fn reference_scenario_with_explicit_integrator() {
    let traj = reference_run(IntegratorType::DormandPrince45);
    check_reference_shape(&traj);
    assert_eq!(traj.stats().jacobian_evals, 0);
}

#[test]
fn integrators_agree_on_reference_scenario() {
    let a = reference_run(IntegratorType::Sdirk21);
    let b = reference_run(IntegratorType::DormandPrince45);

    for (sa, sb) in a.iter().zip(b.iter()) {
        assert_eq!(sa.t, sb.t);
        let (p1_a, p1_b) = (sa.state.pressure1, sb.state.pressure1);
        assert!((p1_a - p1_b).abs() <= 5e-8, "t={}: {p1_a} vs {p1_b}", sa.t);
    }
}

#[test]
fn simulate_is_deterministic() {
    let span = TimeSpan::default();
    let samples = span.evenly_spaced(50);
    let params = PhysicalParameters::default().with_valve_opening(0.3);
    let s0 = SimulationState::new(0.0, 0.0, 2.0e6, 1.0e5);

    let a = simulate(span, &samples, s0, &params).unwrap();
    let b = simulate(span, &samples, s0, &params).unwrap();
    assert_eq!(a.samples(), b.samples());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn zero_piston_mass_is_an_integration_failure() {
    let params = PhysicalParameters {
        piston_mass: 0.0,
        ..PhysicalParameters::default()
    };
    let span = TimeSpan::default();

    let err = simulate(
        span,
        &span.evenly_spaced(200),
        SimulationState::default(),
        &params,
    )
    .unwrap_err();

    match err {
        SimError::IntegrationFailure { reason } => {
            assert!(reason.contains("piston_mass"), "{reason}");
        }
        other => panic!("expected IntegrationFailure, got {other:?}"),
    }
}

#[test]
fn closed_valve_with_equal_pressures_stays_put() {
    let span = TimeSpan::default();
    let s0 = SimulationState::default();
    let params = PhysicalParameters::default().with_valve_opening(0.0);

    let traj = simulate(span, &span.evenly_spaced(20), s0, &params).unwrap();
    assert!(traj.iter().all(|s| s.state == s0));
}

#[test]
fn default_run_config_is_the_reference_scenario() {
    let traj = RunConfig::default().run().unwrap();
    check_reference_shape(&traj);
}

#[test]
fn sweep_preserves_order_and_responds_to_opening() {
    let mut base = RunConfig::default();
    base.time.samples = 20;
    let openings = [0.004, 0.001, 0.002];

    let points = sweep_valve_openings(&base, &openings);
    let order: Vec<f64> = points.iter().map(|p| p.valve_opening).collect();
    assert_eq!(order, openings.to_vec());

    let final_position = |y: f64| -> f64 {
        let point = points.iter().find(|p| p.valve_opening == y).unwrap();
        let traj = point.result.as_ref().unwrap();
        traj.last().unwrap().state.position
    };
    let (x1, x2, x4) = (
        final_position(0.001),
        final_position(0.002),
        final_position(0.004),
    );
    assert!(0.0 < x1 && x1 < x2 && x2 < x4, "{x1} {x2} {x4}");
}

#[test]
fn component_tolerances_resolve_piston_displacement() {
    // p1 rises at a near-constant rate, so x(t) = p1_rate * A / m * t^3 / 6
    let params = PhysicalParameters::default();
    let p1_rate = params.valve_opening * params.valve_gain * (params.supply_pressure - 1.0e5)
        / params.fluid_density;
    let span = TimeSpan::default();
    let x_end = p1_rate * params.piston_area / params.piston_mass * span.end.powi(3) / 6.0;

    let options = SimOptions {
        integration: IntegrationOptions::default()
            .with_component_abs(vec![1e-20, 1e-18, 1e-9, 1e-9]),
        ..SimOptions::default()
    };
    let traj = simulate_with(
        span,
        &span.evenly_spaced(200),
        SimulationState::default(),
        &params,
        &options,
    )
    .unwrap();

    let x = traj.last().unwrap().state.position;
    assert!((x - x_end).abs() < 1e-3 * x_end, "x = {x:e}, expected {x_end:e}");
}
