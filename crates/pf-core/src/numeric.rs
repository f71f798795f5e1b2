use crate::PfError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute/relative tolerance pair.
///
/// Used both for float comparisons and as the error weights of the
/// adaptive integrators (`abs + rel * |y|`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Error weight for a component of magnitude `scale`.
    #[inline]
    pub fn weight(&self, scale: Real) -> Real {
        self.abs + self.rel * scale.abs()
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, PfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PfError::NonFinite { what, value: v })
    }
}

/// Require a strictly positive, finite value.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, PfError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(PfError::InvalidArg { what })
    }
}

/// Require a nonzero denominator.
pub fn ensure_nonzero(v: Real, what: &'static str) -> Result<Real, PfError> {
    if v == 0.0 {
        Err(PfError::DivisionByZero { what })
    } else {
        Ok(v)
    }
}

/// `n` evenly spaced points over `[start, end]`, both endpoints included.
///
/// The last point is exactly `end`.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as Real;
            let mut pts: Vec<Real> = (0..n).map(|i| start + step * i as Real).collect();
            pts[n - 1] = end;
            pts
        }
    }
}
