//! Integration tests: stiff and non-stiff reference problems with known solutions.

use nalgebra::{DMatrix, DVector};
use pf_core::linspace;
use pf_solver::{
    DormandPrince45, FnSystem, IntegrationOptions, IvpSolver, OdeSystem, Sdirk21, SolverResult,
};

/// Prothero-Robinson: y' = -lambda (y - cos t) - sin t, exact y = cos t.
struct ProtheroRobinson {
    lambda: f64,
}

impl OdeSystem for ProtheroRobinson {
    fn dim(&self) -> usize {
        1
    }

    fn rhs(&self, t: f64, y: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(DVector::from_element(
            1,
            -self.lambda * (y[0] - t.cos()) - t.sin(),
        ))
    }

    fn jacobian(&self, _t: f64, _y: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, -self.lambda))
    }
}

#[test]
fn sdirk_tracks_stiff_solution_with_few_steps() {
    let sys = ProtheroRobinson { lambda: 1.0e5 };
    let samples = linspace(0.0, 2.0, 21);
    let y0 = DVector::from_element(1, 1.0);

    let sdirk = Sdirk21::default()
        .solve(&sys, (0.0, 2.0), &y0, &samples)
        .expect("stiff solve should succeed");

    for (t, y) in sdirk.t.iter().zip(&sdirk.y) {
        assert!(
            (y[0] - t.cos()).abs() < 1e-4,
            "t={t}: got {}, expected {}",
            y[0],
            t.cos()
        );
    }

    let explicit = DormandPrince45::default()
        .solve(&sys, (0.0, 2.0), &y0, &samples)
        .expect("explicit solve should succeed, slowly");

    println!(
        "sdirk steps = {}, dopri steps = {}",
        sdirk.stats.accepted_steps, explicit.stats.accepted_steps
    );
    assert!(
        sdirk.stats.accepted_steps * 5 < explicit.stats.accepted_steps,
        "stiffness should force the explicit method into far more steps"
    );
}

#[test]
fn harmonic_oscillator_returns_after_one_period() {
    let sys = FnSystem::new(2, |_t, y: &DVector<f64>| {
        Ok(DVector::from_vec(vec![y[1], -y[0]]))
    });
    let period = 2.0 * std::f64::consts::PI;
    let y0 = DVector::from_vec(vec![1.0, 0.0]);
    let opts = IntegrationOptions::default().with_tolerances(1e-8, 1e-10);

    for sol in [
        DormandPrince45::new(opts.clone()).solve(&sys, (0.0, period), &y0, &[period]),
        Sdirk21::new(opts.clone()).solve(&sys, (0.0, period), &y0, &[period]),
    ] {
        let sol = sol.unwrap();
        let y_end = &sol.y[0];
        assert!((y_end[0] - 1.0).abs() < 1e-5, "cos(2pi) = {}", y_end[0]);
        assert!(y_end[1].abs() < 1e-5, "sin(2pi) = {}", y_end[1]);
    }
}

#[test]
fn results_are_deterministic() {
    let sys = ProtheroRobinson { lambda: 50.0 };
    let samples = linspace(0.0, 1.0, 11);
    let y0 = DVector::from_element(1, 0.0);

    let a = Sdirk21::default().solve(&sys, (0.0, 1.0), &y0, &samples).unwrap();
    let b = Sdirk21::default().solve(&sys, (0.0, 1.0), &y0, &samples).unwrap();

    assert_eq!(a.y, b.y);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn non_finite_rhs_fails_the_whole_run() {
    let sys = FnSystem::new(1, |t, y: &DVector<f64>| {
        if t > 0.3 {
            Ok(DVector::from_element(1, f64::NAN))
        } else {
            Ok(y.clone())
        }
    });
    let y0 = DVector::from_element(1, 1.0);
    let samples = linspace(0.0, 1.0, 5);

    assert!(Sdirk21::default().solve(&sys, (0.0, 1.0), &y0, &samples).is_err());
    assert!(
        DormandPrince45::default()
            .solve(&sys, (0.0, 1.0), &y0, &samples)
            .is_err()
    );
}

#[test]
fn component_tolerances_control_tiny_components() {
    // y0 = t, y1 = 1e-14 t^3: y1 sits far below the scalar absolute tolerance
    let sys = FnSystem::new(2, |t, _y: &DVector<f64>| {
        Ok(DVector::from_vec(vec![1.0, 3.0e-14 * t * t]))
    });
    let y0 = DVector::zeros(2);

    let coarse = Sdirk21::default()
        .solve(&sys, (0.0, 1.0), &y0, &[1.0])
        .unwrap();
    let tuned_opts = IntegrationOptions::default().with_component_abs(vec![1e-9, 1e-20]);
    let tuned = Sdirk21::new(tuned_opts)
        .solve(&sys, (0.0, 1.0), &y0, &[1.0])
        .unwrap();

    let rel_err = (tuned.y[0][1] - 1.0e-14).abs() / 1.0e-14;
    assert!(rel_err < 1e-3, "y1 = {}", tuned.y[0][1]);
    assert!((tuned.y[0][0] - 1.0).abs() < 1e-12);
    assert!(tuned.stats.accepted_steps > coarse.stats.accepted_steps);
}
