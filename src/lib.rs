//! Layout as constrained optimization.
//!
//! `vellum` provides the numeric substrate for optimization-driven layout:
//!
//! - [`Snv`] / [`NullableSnv`]: structured numeric values (nested sequences and
//!   records of scalars) with congruence, vector-space arithmetic, flattening,
//!   pruning and path addressing.
//! - [`ScalarField`]: differentiable scalar fields and the combinators in
//!   [`field`], plus the penalty fields in [`fields`].
//! - [`OptimizationProblem`]: an objective with an initial-guess function.
//! - [`constrain_problem`]: elimination of tied and pinned parameters.
//!
//! The minimizer and the line-packing search live in `vellum-optim`.
//!
//! ```
//! use vellum::{path, snv, Snv};
//!
//! let v = snv!({ "width": 3, "children": [1, 2] });
//! assert_eq!(v.flatten(), vec![1.0, 2.0, 3.0]);
//! assert_eq!(Snv::unflatten(&v, &[0.0, 0.0, 5.0]).scalar_at(&path!["width"]), 5.0);
//! ```

pub mod constrain;
pub mod field;
pub mod fields;
pub mod path;
pub mod path_set;
pub mod problem;
pub mod snv;

pub use constrain::{constrain_problem, ConstrainedProblem, EquivalenceClass, Pin};
pub use field::{ScalarField, SharedField};
pub use fields::{LinearTerm, NonNegativeConstraintField, SoftConstraintField};
pub use path::{Key, Path};
pub use path_set::PathSet;
pub use problem::{check_initial_guess, FnProblem, OptimizationProblem, SharedProblem};
pub use snv::{NullableSnv, Scalar, Snv, StructureError, Tree};
