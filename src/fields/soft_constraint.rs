use crate::field::{check_input, ScalarField};
use crate::path::Path;
use crate::snv::Snv;

/// Intensity used unless [`SoftConstraintField::with_intensity`] says otherwise.
pub const DEFAULT_INTENSITY: f64 = 1000.0;

/// One term `coefficient * (x[path] - offset)` of a linear combination.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearTerm {
    pub coefficient: f64,
    pub path: Path,
    pub offset: f64,
}

impl LinearTerm {
    pub fn new(coefficient: f64, path: Path) -> Self {
        LinearTerm {
            coefficient,
            path,
            offset: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

/// Quadratic penalty on a linear combination of parameters.
///
/// ```text
/// value(x) = intensity * (base + Σ aᵢ (x[pᵢ] - cᵢ))²
/// ```
///
/// Zero exactly where the combination vanishes. A path may appear in several
/// terms; its gradient entries accumulate.
#[derive(Clone, Debug)]
pub struct SoftConstraintField {
    domain: Snv,
    terms: Vec<LinearTerm>,
    intensity: f64,
    base: f64,
}

impl SoftConstraintField {
    /// # Panics
    ///
    /// Panics if a term's path does not address a scalar of `domain`.
    pub fn new(domain: Snv, terms: Vec<LinearTerm>) -> Self {
        for term in &terms {
            match domain.try_get(&term.path) {
                Some(node) if node.is_scalar() => {}
                Some(node) => panic!(
                    "soft constraint term at {} addresses a {}, not a scalar",
                    term.path,
                    node.kind()
                ),
                None => panic!("soft constraint term at {} is outside the domain", term.path),
            }
        }
        SoftConstraintField {
            domain,
            terms,
            intensity: DEFAULT_INTENSITY,
            base: 0.0,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    /// Constant added to the linear combination.
    pub fn with_base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    pub fn terms(&self) -> &[LinearTerm] {
        &self.terms
    }

    /// `base + Σ aᵢ (x[pᵢ] - cᵢ)`.
    pub fn deviation(&self, x: &Snv) -> f64 {
        self.terms.iter().fold(self.base, |acc, t| {
            acc + t.coefficient * (x.scalar_at(&t.path) - t.offset)
        })
    }
}

impl ScalarField for SoftConstraintField {
    fn domain(&self) -> &Snv {
        &self.domain
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.domain, x, "soft constraint input");
        let d = self.deviation(x);
        self.intensity * d * d
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        self.value_and_gradient(x).1
    }

    fn value_and_gradient(&self, x: &Snv) -> (f64, Snv) {
        check_input(&self.domain, x, "soft constraint input");
        let d = self.deviation(x);
        let mut gradient = Snv::zeros_like(&self.domain);
        for term in &self.terms {
            let previous = gradient.scalar_at(&term.path);
            gradient.set_scalar(&term.path, previous + 2.0 * self.intensity * term.coefficient * d);
        }
        (self.intensity * d * d, gradient)
    }
}
