//! Dormand-Prince 5(4) explicit embedded pair.

use crate::error::SolverResult;
use crate::options::IntegrationOptions;
use crate::stepper::{Attempt, SolveStats, Stepper, eval, weighted_rms};
use crate::system::OdeSystem;
use nalgebra::DVector;

const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    // FSAL row, equal to B
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// 5th-order weights minus 4th-order weights.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct DopriStepper;

impl Stepper for DopriStepper {
    fn error_exponent(&self) -> f64 {
        0.2
    }

    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        sys: &S,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        opts: &IntegrationOptions,
        stats: &mut SolveStats,
    ) -> SolverResult<Attempt> {
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(7);
        k.push(eval(sys, t, y, stats)?);

        for i in 1..7 {
            let mut yi = y.clone();
            for (j, kj) in k.iter().enumerate() {
                if A[i][j] != 0.0 {
                    yi.axpy(h * A[i][j], kj, 1.0);
                }
            }
            k.push(eval(sys, t + C[i] * h, &yi, stats)?);
        }

        // Row 6 of A holds the 5th-order weights, so stage 7 was evaluated at y_new
        let mut y_new = y.clone();
        for (j, kj) in k.iter().take(6).enumerate() {
            if A[6][j] != 0.0 {
                y_new.axpy(h * A[6][j], kj, 1.0);
            }
        }

        let mut err = DVector::zeros(y.len());
        for (e, kj) in E.iter().zip(k.iter()) {
            if *e != 0.0 {
                err.axpy(h * e, kj, 1.0);
            }
        }
        let error = weighted_rms(&err, y, &y_new, opts);

        Ok(Attempt::Step { y: y_new, error })
    }
}
