use crate::field::{check_input, ScalarField};
use crate::path::Path;
use crate::snv::Snv;

/// Penalizes a negative parameter: `intensity * x[p]²` where `x[p] < 0`, else 0.
#[derive(Clone, Debug)]
pub struct NonNegativeConstraintField {
    domain: Snv,
    path: Path,
    intensity: f64,
}

impl NonNegativeConstraintField {
    /// # Panics
    ///
    /// Panics if `path` does not address a scalar of `domain`.
    pub fn new(domain: Snv, path: Path, intensity: f64) -> Self {
        assert!(
            domain.try_get(&path).map_or(false, |node| node.is_scalar()),
            "non-negative constraint at {} must address a scalar of the domain",
            path
        );
        NonNegativeConstraintField {
            domain,
            path,
            intensity,
        }
    }
}

impl ScalarField for NonNegativeConstraintField {
    fn domain(&self) -> &Snv {
        &self.domain
    }

    fn value_at(&self, x: &Snv) -> f64 {
        check_input(&self.domain, x, "non-negative constraint input");
        let v = x.scalar_at(&self.path);
        if v < 0.0 {
            self.intensity * v * v
        } else {
            0.0
        }
    }

    fn gradient_at(&self, x: &Snv) -> Snv {
        check_input(&self.domain, x, "non-negative constraint input");
        let v = x.scalar_at(&self.path);
        let mut gradient = Snv::zeros_like(&self.domain);
        if v < 0.0 {
            gradient.set_scalar(&self.path, 2.0 * self.intensity * v);
        }
        gradient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, snv};

    #[test]
    fn only_negative_values_cost() {
        let field = NonNegativeConstraintField::new(snv!({ "height": 0, "width": 0 }), path!["height"], 10.0);
        assert_eq!(field.value_at(&snv!({ "height": 10, "width": 7 })), 0.0);
        assert_eq!(field.value_at(&snv!({ "height": (-10), "width": 7 })), 1000.0);
        assert_eq!(field.value_at(&snv!({ "height": 0, "width": 7 })), 0.0);
        assert_eq!(
            field.gradient_at(&snv!({ "height": 10, "width": 7 })),
            snv!({ "height": 0, "width": 0 })
        );
        assert_eq!(
            field.gradient_at(&snv!({ "height": (-10), "width": 7 })),
            snv!({ "height": (-200), "width": 0 })
        );
    }
}
