//! Finite difference Jacobian computation.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// Default relative perturbation for forward differences (~sqrt(f64::EPSILON)).
pub const DEFAULT_EPSILON: f64 = 1.5e-8;

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
/// `f_x` is `f(x)`, passed in because the integrators already hold it.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);
    let mut x_perturbed = x.clone();

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] = x[j] + dx;

        let f_perturbed = f(&x_perturbed)?;
        jac.set_column(j, &((f_perturbed - f_x) / dx));

        x_perturbed[j] = x[j];
    }

    Ok(jac)
}
