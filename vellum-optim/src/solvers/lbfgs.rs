use std::collections::VecDeque;

use num_traits::Float;
use tracing::{debug, trace};

use crate::convergence::{axpy, dot, norm, ConvergenceParams};
use crate::line_search::{backtracking_armijo, ArmijoParams, LineSearchFailure};
use crate::objective::Objective;
use crate::result::{OptimResult, TerminationReason};

/// L-BFGS settings.
#[derive(Debug, Clone)]
pub struct LbfgsConfig<F> {
    /// Curvature pairs kept; `0` degrades to steepest descent.
    pub memory: usize,
    pub convergence: ConvergenceParams<F>,
    pub line_search: ArmijoParams<F>,
}

impl Default for LbfgsConfig<f64> {
    fn default() -> Self {
        LbfgsConfig {
            memory: 10,
            convergence: ConvergenceParams::default(),
            line_search: ArmijoParams::default(),
        }
    }
}

/// One curvature pair `(s, y)` with `ρ = 1 / sᵀy`.
struct Pair<F> {
    s: Vec<F>,
    y: Vec<F>,
    rho: F,
}

/// Minimize `obj` from `x0` with limited-memory BFGS and Armijo backtracking.
///
/// Accepted steps strictly decrease the objective, so the returned point is
/// the best iterate seen on every termination path. When the quasi-Newton
/// direction fails the line search, the memory is dropped and steepest
/// descent is tried before giving up.
///
/// # Panics
///
/// Panics if `x0.len() != obj.dim()`.
pub fn lbfgs<F: Float, O: Objective<F>>(obj: &mut O, x0: &[F], config: &LbfgsConfig<F>) -> OptimResult<F> {
    assert_eq!(
        x0.len(),
        obj.dim(),
        "lbfgs: starting point has {} entries, objective has {} parameters",
        x0.len(),
        obj.dim()
    );
    let conv = &config.convergence;

    let mut x = x0.to_vec();
    let (mut value, mut grad) = obj.eval_grad(&x);
    let mut func_evals = 1;
    let mut grad_norm = norm(&grad);

    let finish = |x: Vec<F>, value: F, gradient: Vec<F>, gradient_norm: F, iterations, func_evals, termination| {
        debug!(
            %termination,
            iterations,
            func_evals,
            value = value.to_f64().unwrap_or(f64::NAN),
            gradient_norm = gradient_norm.to_f64().unwrap_or(f64::NAN),
            "lbfgs finished"
        );
        OptimResult {
            x,
            value,
            gradient,
            gradient_norm,
            iterations,
            func_evals,
            termination,
        }
    };

    if !value.is_finite() || !grad_norm.is_finite() {
        return finish(x, value, grad, grad_norm, 0, func_evals, TerminationReason::NumericalError);
    }
    if grad_norm <= conv.grad_tol {
        return finish(x, value, grad, grad_norm, 0, func_evals, TerminationReason::GradientNorm);
    }

    let mut history: VecDeque<Pair<F>> = VecDeque::with_capacity(config.memory);

    for iter in 0..conv.max_iter {
        let d = direction(&grad, &history);
        let step = match backtracking_armijo(obj, &x, &d, value, &grad, &config.line_search) {
            Ok(step) => step,
            Err(failure) => {
                if let LineSearchFailure::Exhausted(evals) = failure {
                    func_evals += evals;
                }
                if history.is_empty() {
                    return finish(
                        x,
                        value,
                        grad,
                        grad_norm,
                        iter,
                        func_evals,
                        TerminationReason::LineSearchFailed,
                    );
                }
                trace!(iter, ?failure, "dropping curvature memory");
                history.clear();
                continue;
            }
        };
        func_evals += step.evals;

        let new_norm = norm(&step.gradient);
        if !new_norm.is_finite() {
            return finish(
                x,
                value,
                grad,
                grad_norm,
                iter,
                func_evals,
                TerminationReason::NumericalError,
            );
        }

        let mut s = vec![F::zero(); d.len()];
        axpy(step.alpha, &d, &mut s);
        let y: Vec<F> = step.gradient.iter().zip(&grad).map(|(&a, &b)| a - b).collect();
        axpy(F::one(), &s, &mut x);

        let previous = value;
        value = step.value;
        grad = step.gradient;
        grad_norm = new_norm;

        let sy = dot(&s, &y);
        if config.memory > 0 && sy > F::zero() {
            if history.len() == config.memory {
                history.pop_front();
            }
            history.push_back(Pair {
                s,
                y,
                rho: F::one() / sy,
            });
        }

        let done = if grad_norm <= conv.grad_tol {
            Some(TerminationReason::GradientNorm)
        } else if step.alpha * norm(&d) < conv.step_tol {
            Some(TerminationReason::StepSize)
        } else if conv.func_tol > F::zero() && (previous - value).abs() < conv.func_tol {
            Some(TerminationReason::FunctionChange)
        } else {
            None
        };
        if let Some(reason) = done {
            return finish(x, value, grad, grad_norm, iter + 1, func_evals, reason);
        }
    }

    finish(
        x,
        value,
        grad,
        grad_norm,
        conv.max_iter,
        func_evals,
        TerminationReason::MaxIterations,
    )
}

/// Two-loop recursion: `-H g` for the inverse Hessian estimate `H`.
fn direction<F: Float>(grad: &[F], history: &VecDeque<Pair<F>>) -> Vec<F> {
    let mut q = grad.to_vec();
    let mut alphas = Vec::with_capacity(history.len());
    for pair in history.iter().rev() {
        let a = pair.rho * dot(&pair.s, &q);
        axpy(-a, &pair.y, &mut q);
        alphas.push(a);
    }

    // Scale by sᵀy / yᵀy of the newest pair.
    if let Some(newest) = history.back() {
        let yy = dot(&newest.y, &newest.y);
        if yy > F::zero() {
            let gamma = F::one() / (newest.rho * yy);
            q.iter_mut().for_each(|v| *v = *v * gamma);
        }
    }

    for (pair, &a) in history.iter().zip(alphas.iter().rev()) {
        let b = pair.rho * dot(&pair.y, &q);
        axpy(a - b, &pair.s, &mut q);
    }

    q.iter_mut().for_each(|v| *v = -*v);
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rosenbrock;

    impl Objective<f64> for Rosenbrock {
        fn dim(&self) -> usize {
            2
        }

        fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
            let a = 1.0 - x[0];
            let b = x[1] - x[0] * x[0];
            (
                a * a + 100.0 * b * b,
                vec![-2.0 * a - 400.0 * x[0] * b, 200.0 * b],
            )
        }
    }

    #[test]
    fn solves_rosenbrock() {
        let mut config = LbfgsConfig::default();
        config.convergence.grad_tol = 1e-8;
        let result = lbfgs(&mut Rosenbrock, &[0.0, 0.0], &config);
        assert_eq!(result.termination, TerminationReason::GradientNorm);
        assert!((result.x[0] - 1.0).abs() < 1e-6, "x = {:?}", result.x);
        assert!((result.x[1] - 1.0).abs() < 1e-6, "x = {:?}", result.x);
    }

    #[test]
    fn stationary_start_needs_no_iterations() {
        let result = lbfgs(&mut Rosenbrock, &[1.0, 1.0], &LbfgsConfig::default());
        assert_eq!(result.termination, TerminationReason::GradientNorm);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.func_evals, 1);
    }

    #[test]
    fn zero_iteration_cap_returns_start() {
        let mut config = LbfgsConfig::default();
        config.convergence.max_iter = 0;
        let result = lbfgs(&mut Rosenbrock, &[0.0, 0.0], &config);
        assert_eq!(result.termination, TerminationReason::MaxIterations);
        assert_eq!(result.x, vec![0.0, 0.0]);
        assert_eq!(result.value, 1.0);
    }

    #[test]
    fn iteration_cap_keeps_progress() {
        let mut config = LbfgsConfig::default();
        config.convergence.max_iter = 3;
        let result = lbfgs(&mut Rosenbrock, &[-1.2, 1.0], &config);
        assert_eq!(result.termination, TerminationReason::MaxIterations);
        assert!(result.value < 24.2);
    }

    #[test]
    fn steepest_descent_without_memory() {
        struct Bowl;
        impl Objective<f64> for Bowl {
            fn dim(&self) -> usize {
                1
            }
            fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
                ((x[0] - 3.0).powi(2), vec![2.0 * (x[0] - 3.0)])
            }
        }
        let mut config = LbfgsConfig::default();
        config.memory = 0;
        let result = lbfgs(&mut Bowl, &[0.0], &config);
        assert!(result.termination.is_converged());
        assert!((result.x[0] - 3.0).abs() < 1e-6);
    }
}
