use num_traits::Float;

/// Stopping criteria shared by the minimizers.
#[derive(Debug, Clone)]
pub struct ConvergenceParams<F> {
    /// Hard cap on outer iterations.
    pub max_iter: usize,
    /// Stop once the gradient norm drops below this.
    pub grad_tol: F,
    /// Stop once an accepted step is shorter than this.
    pub step_tol: F,
    /// Stop once the objective changes by less than this; `0` disables the test.
    pub func_tol: F,
}

impl Default for ConvergenceParams<f64> {
    fn default() -> Self {
        ConvergenceParams {
            max_iter: 200,
            grad_tol: 1e-7,
            step_tol: 1e-12,
            func_tol: 0.0,
        }
    }
}

/// Euclidean norm.
pub fn norm<F: Float>(v: &[F]) -> F {
    dot(v, v).sqrt()
}

/// Inner product of two equally long vectors.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .fold(F::zero(), |acc, (&x, &y)| acc + x * y)
}

/// `y += alpha * x`.
pub(crate) fn axpy<F: Float>(alpha: F, x: &[F], y: &mut [F]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = *yi + alpha * xi;
    }
}
