//! Optimization problems: an objective plus a way to guess a starting point.

use std::sync::Arc;

use crate::field::SharedField;
use crate::path::{Key, Path};
use crate::snv::{NullableSnv, Scalar, Snv, Tree};

/// An objective field paired with an initial-guess function.
///
/// `initial_guess` receives a partial assignment congruent to the objective's
/// domain and must return a full value congruent to the domain that keeps
/// every set scalar of the assignment verbatim.
pub trait OptimizationProblem: Send + Sync {
    fn objective(&self) -> SharedField;

    fn initial_guess(&self, constraints: &NullableSnv) -> Snv;

    /// Representative of the domain; shorthand for `objective().domain()`.
    fn domain(&self) -> Snv {
        self.objective().domain().clone()
    }

    /// Initial guess with nothing pinned.
    fn unconstrained_guess(&self) -> Snv {
        self.initial_guess(&NullableSnv::nulls_like(self.objective().domain()))
    }
}

/// Shared handle to an optimization problem.
pub type SharedProblem = Arc<dyn OptimizationProblem>;

/// A problem whose initial guess is computed by a closure.
pub struct FnProblem<G> {
    objective: SharedField,
    guess: G,
}

impl<G> FnProblem<G>
where
    G: Fn(&NullableSnv) -> Snv + Send + Sync,
{
    pub fn new(objective: SharedField, guess: G) -> Self {
        FnProblem { objective, guess }
    }
}

impl FnProblem<Box<dyn Fn(&NullableSnv) -> Snv + Send + Sync>> {
    /// A problem whose initial guess fills every hole with `fill`.
    pub fn filling(objective: SharedField, fill: f64) -> Self {
        FnProblem {
            objective,
            guess: Box::new(move |c: &NullableSnv| c.fill_holes(fill)),
        }
    }
}

impl<G> OptimizationProblem for FnProblem<G>
where
    G: Fn(&NullableSnv) -> Snv + Send + Sync,
{
    fn objective(&self) -> SharedField {
        Arc::clone(&self.objective)
    }

    fn initial_guess(&self, constraints: &NullableSnv) -> Snv {
        (self.guess)(constraints)
    }
}

/// Panics unless `guess` is congruent to `constraints` and repeats each of
/// its set scalars exactly.
pub fn check_initial_guess(constraints: &NullableSnv, guess: &Snv) {
    constraints.assert_congruent(guess, "initial guess");
    fn go(c: &NullableSnv, g: &Snv, path: &mut Path) {
        match (c, g) {
            (Tree::Scalar(Some(want)), Tree::Scalar(got)) => assert!(
                want.same(got),
                "initial guess changed the constraint at {}: expected {}, got {}",
                path,
                want,
                got
            ),
            (Tree::Scalar(None), _) => {}
            (Tree::Seq(cs), Tree::Seq(gs)) => {
                for (i, (c, g)) in cs.iter().zip(gs).enumerate() {
                    path.push(Key::Index(i));
                    go(c, g, path);
                    path.pop();
                }
            }
            (Tree::Record(cs), Tree::Record(gs)) => {
                for ((k, c), g) in cs.iter().zip(gs.values()) {
                    path.push(Key::Name(k.clone()));
                    go(c, g, path);
                    path.pop();
                }
            }
            _ => unreachable!("congruence checked above"),
        }
    }
    go(constraints, guess, &mut Path::root());
}
