//! Solving [`OptimizationProblem`]s over structured values.

use vellum::{check_initial_guess, NullableSnv, OptimizationProblem, Snv};

use crate::convergence::ConvergenceParams;
use crate::error::SettingsError;
use crate::line_search::ArmijoParams;
use crate::objective::{FieldObjective, Objective};
use crate::result::TerminationReason;
use crate::solvers::lbfgs::{lbfgs, LbfgsConfig};

/// Minimizer settings.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverSettings {
    /// Gradient-norm threshold; the step threshold is derived from it.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// L-BFGS curvature pairs.
    pub memory: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            tolerance: 1e-7,
            max_iterations: 200,
            memory: 10,
        }
    }
}

impl SolverSettings {
    pub fn new(tolerance: f64, max_iterations: usize) -> Result<Self, SettingsError> {
        let settings = SolverSettings {
            tolerance,
            max_iterations,
            ..Default::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tolerance > 0.0 && self.tolerance.is_finite() {
            Ok(())
        } else {
            Err(SettingsError::InvalidTolerance(self.tolerance))
        }
    }

    pub fn lbfgs_config(&self) -> LbfgsConfig<f64> {
        LbfgsConfig {
            memory: self.memory,
            convergence: ConvergenceParams {
                max_iter: self.max_iterations,
                grad_tol: self.tolerance,
                step_tol: self.tolerance * 1e-4,
                func_tol: 0.0,
            },
            line_search: ArmijoParams::default(),
        }
    }
}

/// A minimizer's answer, unflattened onto the problem's domain.
#[derive(Clone, Debug)]
pub struct Solution {
    pub value: Snv,
    /// Objective at `value`.
    pub objective: f64,
    /// Residual gradient norm at `value`.
    pub gradient_norm: f64,
    pub iterations: usize,
    pub func_evals: usize,
    pub termination: TerminationReason,
}

impl Solution {
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

/// Minimize `problem` from its unconstrained initial guess.
pub fn solve(problem: &dyn OptimizationProblem, settings: &SolverSettings) -> Solution {
    let objective = problem.objective();
    solve_from(problem, &NullableSnv::nulls_like(objective.domain()), settings)
}

/// Minimize `problem` from the initial guess for `constraints`.
///
/// The constraints only seed the starting point; the minimizer is free to
/// move every parameter. Use constraint elimination to hold values fixed.
///
/// # Panics
///
/// Panics if `constraints` is not congruent to the domain, or the problem's
/// initial guess is not congruent or overwrites a constraint.
pub fn solve_from(
    problem: &dyn OptimizationProblem,
    constraints: &NullableSnv,
    settings: &SolverSettings,
) -> Solution {
    let objective = problem.objective();
    let domain = objective.domain();
    domain.assert_congruent(constraints, "solve constraints");
    let guess = problem.initial_guess(constraints);
    check_initial_guess(constraints, &guess);

    let mut flat = FieldObjective::new(objective.as_ref());
    debug_assert_eq!(flat.dim(), guess.dim());
    let result = lbfgs(&mut flat, &guess.flatten(), &settings.lbfgs_config());
    Solution {
        value: Snv::unflatten(domain, &result.x),
        objective: result.value,
        gradient_norm: result.gradient_norm,
        iterations: result.iterations,
        func_evals: flat.func_evals(),
        termination: result.termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;
    use vellum::field::from_fns;
    use vellum::{path, snv, FnProblem};

    /// `(w - 4)² + (h[0] + 1)² + (h[1] - 2)²`
    fn bowl() -> FnProblem<Box<dyn Fn(&NullableSnv) -> Snv + Send + Sync>> {
        let field = from_fns(
            snv!({ "w": 0, "h": [0, 0] }),
            |v| {
                let w = v.scalar_at(&path!["w"]) - 4.0;
                let h0 = v.scalar_at(&path!["h", 0]) + 1.0;
                let h1 = v.scalar_at(&path!["h", 1]) - 2.0;
                w * w + h0 * h0 + h1 * h1
            },
            |v| {
                let w = v.scalar_at(&path!["w"]) - 4.0;
                let h0 = v.scalar_at(&path!["h", 0]) + 1.0;
                let h1 = v.scalar_at(&path!["h", 1]) - 2.0;
                snv!({ "w": (2.0 * w), "h": [(2.0 * h0), (2.0 * h1)] })
            },
        );
        FnProblem::filling(field, 0.0)
    }

    #[test]
    fn finds_minimum_of_structured_bowl() {
        let solution = solve(&bowl(), &SolverSettings::default());
        assert!(solution.converged(), "{}", solution.termination);
        assert_abs_diff_eq!(solution.value.scalar_at(&path!["w"]), 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.value.scalar_at(&path!["h", 0]), -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.value.scalar_at(&path!["h", 1]), 2.0, epsilon = 1e-6);
        assert!(solution.objective < 1e-10);
    }

    #[test]
    fn solve_from_starts_at_constraints() {
        let mut start = NullableSnv::nulls_like(&snv!({ "w": 0, "h": [0, 0] }));
        start.set_scalar(&path!["w"], Some(4.0));
        let settings = SolverSettings {
            max_iterations: 0,
            ..Default::default()
        };
        let solution = solve_from(&bowl(), &start, &settings);
        assert_eq!(solution.termination, TerminationReason::MaxIterations);
        assert_eq!(solution.value, snv!({ "w": 4, "h": [0, 0] }));
        assert_eq!(solution.objective, 5.0);
    }

    #[test]
    fn empty_domain_is_trivially_solved() {
        let problem = FnProblem::filling(vellum::field::constant(snv!({ "a": [] }), 3.0), 0.0);
        let solution = solve(&problem, &SolverSettings::default());
        assert_eq!(solution.termination, TerminationReason::GradientNorm);
        assert_eq!(solution.value, snv!({ "a": [] }));
        assert_eq!(solution.objective, 3.0);
    }

    #[test]
    fn rejects_bad_tolerance() {
        assert_eq!(
            SolverSettings::new(0.0, 10),
            Err(SettingsError::InvalidTolerance(0.0))
        );
        assert!(SolverSettings::new(f64::NAN, 10).is_err());
        assert!(SolverSettings::new(1e-3, 10).is_ok());
    }

    #[test]
    #[should_panic(expected = "changed the constraint")]
    fn guess_must_respect_constraints() {
        let field = vellum::field::constant(snv!([0]), 0.0);
        let problem = FnProblem::new(field, |c: &NullableSnv| Snv::zeros_like(c));
        let mut c = NullableSnv::nulls_like(&snv!([0]));
        c.set_scalar(&path![0], Some(1.0));
        solve_from(&problem, &c, &SolverSettings::default());
    }

    #[test]
    fn shared_problems_solve_too() {
        let problem: vellum::SharedProblem = Arc::new(bowl());
        let solution = solve(problem.as_ref(), &SolverSettings::default());
        assert!(solution.converged());
    }
}
