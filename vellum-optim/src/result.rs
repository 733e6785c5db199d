use std::fmt;

/// Outcome of a minimization.
///
/// `x` is the best iterate seen, whatever the termination reason.
#[derive(Debug, Clone)]
pub struct OptimResult<F> {
    pub x: Vec<F>,
    /// Objective at `x`.
    pub value: F,
    /// Gradient at `x`.
    pub gradient: Vec<F>,
    pub gradient_norm: F,
    /// Outer iterations performed.
    pub iterations: usize,
    /// Objective evaluations, line search included.
    pub func_evals: usize,
    pub termination: TerminationReason,
}

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Gradient norm fell below tolerance.
    GradientNorm,
    /// Accepted step fell below tolerance.
    StepSize,
    /// Objective change fell below tolerance.
    FunctionChange,
    /// Iteration cap reached.
    MaxIterations,
    /// No sufficient decrease along steepest descent.
    LineSearchFailed,
    /// The objective or gradient stopped being finite.
    NumericalError,
}

impl TerminationReason {
    /// True for the tolerance-based stops.
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            TerminationReason::GradientNorm
                | TerminationReason::StepSize
                | TerminationReason::FunctionChange
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::GradientNorm => "gradient norm below tolerance",
            TerminationReason::StepSize => "step below tolerance",
            TerminationReason::FunctionChange => "objective change below tolerance",
            TerminationReason::MaxIterations => "iteration limit reached",
            TerminationReason::LineSearchFailed => "line search failed",
            TerminationReason::NumericalError => "non-finite objective or gradient",
        };
        f.write_str(text)
    }
}
