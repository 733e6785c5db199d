//! Constraint elimination.
//!
//! Equality constraints among scalar parameters, and pins of parameters to a
//! constant or a computed value, are applied by *removing* parameters from the
//! domain rather than by penalty. Given equivalence classes of paths:
//!
//! 1. every path of a pinned class, and every path but the first of an
//!    equality class, is eliminated;
//! 2. the reduced domain is the original domain pruned of eliminated paths;
//! 3. `unconstrain` coprunes a reduced value back to the original shape and
//!    restores each class (the first path's value, the constant, or the
//!    computed value at every member);
//! 4. `constrain` prunes a full value with the same path set.
//!
//! `constrain(unconstrain(v))` deep-equals `v` for every `v` congruent to the
//! reduced domain. The other composition forgets eliminated values.
//!
//! The reduced objective evaluates the original one at `unconstrain(v)`. Its
//! gradient at a surviving representative is the sum of the original gradient
//! over the representative's class, which is the chain rule through the linear
//! map `unconstrain`. Computed pins are treated as constants for
//! differentiation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::field::{check_input, ScalarField, SharedField};
use crate::path::Path;
use crate::path_set::PathSet;
use crate::problem::{OptimizationProblem, SharedProblem};
use crate::snv::{NullableSnv, Scalar, Snv, Tree};

/// Value every member of a pinned class takes.
#[derive(Clone)]
pub enum Pin {
    Constant(f64),
    /// Computed from the full value after equalities and constants are restored.
    Computed(Arc<dyn Fn(&Snv) -> f64 + Send + Sync>),
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Constant(c) => f.debug_tuple("Constant").field(c).finish(),
            Pin::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A group of paths forced to share one value.
#[derive(Clone, Debug)]
pub struct EquivalenceClass {
    paths: Vec<Path>,
    pin: Option<Pin>,
}

impl EquivalenceClass {
    /// All `paths` take the value of the first one.
    pub fn equal(paths: impl IntoIterator<Item = Path>) -> Self {
        EquivalenceClass {
            paths: paths.into_iter().collect(),
            pin: None,
        }
    }

    /// All `paths` take `value`.
    pub fn pinned(paths: impl IntoIterator<Item = Path>, value: f64) -> Self {
        EquivalenceClass {
            paths: paths.into_iter().collect(),
            pin: Some(Pin::Constant(value)),
        }
    }

    /// All `paths` take `f` of the full value.
    pub fn computed(
        paths: impl IntoIterator<Item = Path>,
        f: impl Fn(&Snv) -> f64 + Send + Sync + 'static,
    ) -> Self {
        EquivalenceClass {
            paths: paths.into_iter().collect(),
            pin: Some(Pin::Computed(Arc::new(f))),
        }
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn pin(&self) -> Option<&Pin> {
        self.pin.as_ref()
    }

    /// The path that survives elimination, for equality classes.
    pub fn representative(&self) -> Option<&Path> {
        match self.pin {
            Some(_) => None,
            None => self.paths.first(),
        }
    }

    /// Paths removed from the domain.
    fn eliminated(&self) -> &[Path] {
        match self.pin {
            Some(_) => &self.paths,
            None => self.paths.get(1..).unwrap_or(&[]),
        }
    }
}

/// The reduction shared by a constrained problem and its objective.
struct Elimination {
    domain: Snv,
    reduced: Snv,
    classes: Vec<EquivalenceClass>,
    eliminated: PathSet,
}

impl Elimination {
    fn new(domain: Snv, classes: Vec<EquivalenceClass>) -> Self {
        let mut seen = HashSet::new();
        for class in &classes {
            assert!(
                !class.paths.is_empty(),
                "equivalence class must name at least one path"
            );
            for path in &class.paths {
                assert!(!path.is_empty(), "cannot constrain the root of the domain");
                match domain.try_get(path) {
                    Some(node) if node.is_scalar() => {}
                    Some(node) => panic!(
                        "constraint path {} addresses a {}, not a scalar",
                        path,
                        node.kind()
                    ),
                    None => panic!("constraint path {} does not exist in the domain", path),
                }
                assert!(
                    seen.insert(path.clone()),
                    "constraint path {} occurs more than once",
                    path
                );
            }
        }

        let eliminated: PathSet = classes.iter().flat_map(EquivalenceClass::eliminated).collect();
        let reduced = domain.prune_by(|_, p| !eliminated.contains(p));
        Elimination {
            domain,
            reduced,
            classes,
            eliminated,
        }
    }

    fn constrain<S: Scalar>(&self, full: &Tree<S>) -> Tree<S> {
        self.domain.assert_congruent(full, "constrain");
        full.prune_by(|_, p| !self.eliminated.contains(p))
    }

    fn unconstrain(&self, reduced: &Snv) -> Snv {
        self.reduced.assert_congruent(reduced, "unconstrain");
        let mut full = self
            .domain
            .coprune_by(|_, p| !self.eliminated.contains(p), reduced);

        for class in &self.classes {
            match &class.pin {
                None => {
                    let value = full.scalar_at(&class.paths[0]);
                    for path in &class.paths[1..] {
                        full.set_scalar(path, value);
                    }
                }
                Some(Pin::Constant(c)) => {
                    for path in &class.paths {
                        full.set_scalar(path, *c);
                    }
                }
                Some(Pin::Computed(_)) => {}
            }
        }

        let computed: Vec<(&EquivalenceClass, f64)> = self
            .classes
            .iter()
            .filter_map(|class| match &class.pin {
                Some(Pin::Computed(f)) => Some((class, f(&full))),
                _ => None,
            })
            .collect();
        for (class, value) in computed {
            for path in &class.paths {
                full.set_scalar(path, value);
            }
        }
        full
    }

    fn unconstrain_nullable(&self, reduced: &NullableSnv) -> NullableSnv {
        self.reduced.assert_congruent(reduced, "unconstrain");
        let mut full = NullableSnv::nulls_like(&self.domain)
            .coprune_by(|_, p| !self.eliminated.contains(p), reduced);
        for class in &self.classes {
            let value = match &class.pin {
                None => full.scalar_at(&class.paths[0]),
                Some(Pin::Constant(c)) => Some(*c),
                Some(Pin::Computed(_)) => None,
            };
            for path in class.eliminated() {
                full.set_scalar(path, value);
            }
        }
        full
    }

    /// Pull a gradient on the full domain back to the reduced domain.
    fn constrain_gradient(&self, full: &Snv) -> Snv {
        let mut gradient = full.clone();
        for class in &self.classes {
            if let Some(rep) = class.representative() {
                let total: f64 = class.paths.iter().map(|p| full.scalar_at(p)).sum();
                gradient.set_scalar(rep, total);
            }
        }
        self.constrain(&gradient)
    }
}

/// The objective of a [`ConstrainedProblem`], defined on the reduced domain.
pub struct ConstrainedField {
    inner: SharedField,
    elimination: Arc<Elimination>,
}

impl ScalarField for ConstrainedField {
    fn domain(&self) -> &Snv {
        &self.elimination.reduced
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.elimination.reduced, x, "constrained field input");
        self.inner.value_at(&self.elimination.unconstrain(x))
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        self.value_and_gradient(x).1
    }

    fn value_and_gradient(&self, x: &Snv) -> (f64, Snv) {
        check_input(&self.elimination.reduced, x, "constrained field input");
        let (value, full) = self
            .inner
            .value_and_gradient(&self.elimination.unconstrain(x));
        (value, self.elimination.constrain_gradient(&full))
    }
}

/// An optimization problem with some parameters eliminated.
///
/// Built by [`constrain_problem`].
pub struct ConstrainedProblem {
    inner: SharedProblem,
    elimination: Arc<Elimination>,
    objective: SharedField,
}

impl ConstrainedProblem {
    /// The unconstrained problem.
    pub fn original(&self) -> &SharedProblem {
        &self.inner
    }

    pub fn classes(&self) -> &[EquivalenceClass] {
        &self.elimination.classes
    }

    /// Paths removed from the original domain.
    pub fn eliminated(&self) -> &PathSet {
        &self.elimination.eliminated
    }

    pub fn reduced_domain(&self) -> &Snv {
        &self.elimination.reduced
    }

    /// Project a value of the original domain onto the reduced domain.
    pub fn constrain(&self, full: &Snv) -> Snv {
        self.elimination.constrain(full)
    }

    /// Lift a value of the reduced domain to one satisfying every class.
    pub fn unconstrain(&self, reduced: &Snv) -> Snv {
        self.elimination.unconstrain(reduced)
    }

    pub fn constrain_nullable(&self, full: &NullableSnv) -> NullableSnv {
        self.elimination.constrain(full)
    }

    /// Like [`ConstrainedProblem::unconstrain`]; computed pins stay unset.
    pub fn unconstrain_nullable(&self, reduced: &NullableSnv) -> NullableSnv {
        self.elimination.unconstrain_nullable(reduced)
    }
}

impl OptimizationProblem for ConstrainedProblem {
    fn objective(&self) -> SharedField {
        Arc::clone(&self.objective)
    }

    fn initial_guess(&self, constraints: &NullableSnv) -> Snv {
        let full = self.elimination.unconstrain_nullable(constraints);
        self.elimination.constrain(&self.inner.initial_guess(&full))
    }
}

/// Eliminate the parameters tied by `classes` from `problem`.
///
/// # Panics
///
/// Panics if a class is empty, or a path is the root, is missing from the
/// domain, addresses a container, or occurs twice.
pub fn constrain_problem(problem: SharedProblem, classes: Vec<EquivalenceClass>) -> ConstrainedProblem {
    let elimination = Arc::new(Elimination::new(problem.domain(), classes));
    let objective: SharedField = Arc::new(ConstrainedField {
        inner: problem.objective(),
        elimination: Arc::clone(&elimination),
    });
    ConstrainedProblem {
        inner: problem,
        elimination,
        objective,
    }
}
