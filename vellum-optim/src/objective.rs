use vellum::{ScalarField, Snv};

/// A differentiable function of a flat parameter vector.
///
/// Methods take `&mut self` so implementors can count evaluations or keep buffers.
pub trait Objective<F: num_traits::Float> {
    /// Number of parameters.
    fn dim(&self) -> usize;

    /// `(f(x), ∇f(x))`.
    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>);
}

/// Presents a [`ScalarField`] as an [`Objective`] over its flattened domain.
pub struct FieldObjective<'a> {
    field: &'a dyn ScalarField,
    func_evals: usize,
}

impl<'a> FieldObjective<'a> {
    pub fn new(field: &'a dyn ScalarField) -> Self {
        FieldObjective {
            field,
            func_evals: 0,
        }
    }

    /// Evaluations performed so far.
    pub fn func_evals(&self) -> usize {
        self.func_evals
    }

    pub fn field(&self) -> &'a dyn ScalarField {
        self.field
    }
}

impl Objective<f64> for FieldObjective<'_> {
    fn dim(&self) -> usize {
        self.field.domain().dim()
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        self.func_evals += 1;
        let point = Snv::unflatten(self.field.domain(), x);
        let (value, gradient) = self.field.value_and_gradient(&point);
        (value, gradient.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum::field::from_fns;
    use vellum::{path, snv};

    #[test]
    fn flattens_in_canonical_order() {
        let field = from_fns(
            snv!({ "b": 0, "a": [0, 0] }),
            |v| v.scalar_at(&path!["b"]) * v.scalar_at(&path!["a", 1]),
            |v| snv!({ "b": (v.scalar_at(&path!["a", 1])), "a": [0, (v.scalar_at(&path!["b"]))] }),
        );
        let mut obj = FieldObjective::new(field.as_ref());
        assert_eq!(obj.dim(), 3);
        // flat order: a[0], a[1], b
        let (value, gradient) = obj.eval_grad(&[9.0, 2.0, 5.0]);
        assert_eq!(value, 10.0);
        assert_eq!(gradient, vec![0.0, 5.0, 2.0]);
        assert_eq!(obj.func_evals(), 1);
    }
}
