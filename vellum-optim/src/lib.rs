//! Minimizing vellum optimization problems, and the searches built on top:
//! beam search over paths and line packing.

pub mod beam;
pub mod convergence;
pub mod error;
pub mod line_packing;
pub mod line_search;
pub mod objective;
pub mod result;
pub mod solve;
pub mod solvers;

pub use beam::{solve_path_problem, PathProblem};
pub use convergence::ConvergenceParams;
pub use error::SettingsError;
pub use line_packing::{
    create_line, pack_lines, Line, LineBox, LineLengths, LinePacking, LinePackingProblem,
    LinePackingSettings, SearchCache, SearchStats,
};
pub use line_search::ArmijoParams;
pub use objective::{FieldObjective, Objective};
pub use result::{OptimResult, TerminationReason};
pub use solve::{solve, solve_from, Solution, SolverSettings};
pub use solvers::lbfgs::{lbfgs, LbfgsConfig};
