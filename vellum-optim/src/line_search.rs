use num_traits::Float;

use crate::convergence::{axpy, dot};
use crate::objective::Objective;

/// Backtracking line search parameters.
#[derive(Debug, Clone)]
pub struct ArmijoParams<F> {
    /// Sufficient decrease constant.
    pub c: F,
    /// Shrink factor applied after each rejected step.
    pub rho: F,
    /// First step tried.
    pub alpha_init: F,
    /// Give up below this step.
    pub alpha_min: F,
}

impl Default for ArmijoParams<f64> {
    fn default() -> Self {
        ArmijoParams {
            c: 1e-4,
            rho: 0.5,
            alpha_init: 1.0,
            alpha_min: 1e-16,
        }
    }
}

/// An accepted step.
#[derive(Debug)]
pub struct LineSearchResult<F> {
    pub alpha: F,
    /// Objective at `x + alpha * d`.
    pub value: F,
    /// Gradient at `x + alpha * d`.
    pub gradient: Vec<F>,
    /// Objective evaluations spent.
    pub evals: usize,
}

/// Outcome of [`backtracking_armijo`] when no step is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearchFailure {
    /// `d` does not point downhill.
    NotDescent,
    /// Shrunk below `alpha_min`; carries the evaluations spent.
    Exhausted(usize),
}

/// Shrink `alpha` until `f(x + alpha d) <= f(x) + c alpha gᵀd`.
///
/// Trial points with a non-finite objective are rejected like points without
/// sufficient decrease, and so are trial points that do not strictly lower
/// the objective (a step too short to move `x` would otherwise pass).
pub fn backtracking_armijo<F: Float, O: Objective<F>>(
    obj: &mut O,
    x: &[F],
    d: &[F],
    f_x: F,
    grad_x: &[F],
    params: &ArmijoParams<F>,
) -> Result<LineSearchResult<F>, LineSearchFailure> {
    let slope = dot(grad_x, d);
    if slope.is_nan() || slope >= F::zero() {
        return Err(LineSearchFailure::NotDescent);
    }

    let mut alpha = params.alpha_init;
    let mut trial = x.to_vec();
    let mut evals = 0;
    while alpha >= params.alpha_min {
        trial.copy_from_slice(x);
        axpy(alpha, d, &mut trial);
        let (f_new, g_new) = obj.eval_grad(&trial);
        evals += 1;
        if f_new.is_finite() && f_new < f_x && f_new <= f_x + params.c * alpha * slope {
            return Ok(LineSearchResult {
                alpha,
                value: f_new,
                gradient: g_new,
                evals,
            });
        }
        alpha = alpha * params.rho;
    }
    Err(LineSearchFailure::Exhausted(evals))
}
