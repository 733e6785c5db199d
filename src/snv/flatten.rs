//! Flattening to and from a linear list of scalars.
//!
//! Scalars are visited in sequence order and, inside records, in sorted key
//! order. `unflatten(rep, flatten(v)) == v` for every `v` congruent to `rep`.

use super::{Scalar, Tree};

impl<S: Scalar> Tree<S> {
    /// All scalars in canonical order.
    pub fn flatten(&self) -> Vec<S> {
        let mut out = Vec::with_capacity(self.dim());
        self.flatten_into(&mut out);
        out
    }

    /// Append all scalars in canonical order to `out`.
    pub fn flatten_into(&self, out: &mut Vec<S>) {
        match self {
            Tree::Scalar(s) => out.push(*s),
            Tree::Seq(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            Tree::Record(fields) => {
                for value in fields.values() {
                    value.flatten_into(out);
                }
            }
        }
    }

    /// Rebuild a value congruent to `representative` from flattened scalars.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from `representative.dim()`.
    pub fn unflatten<R: Scalar>(representative: &Tree<R>, values: &[S]) -> Tree<S> {
        let dim = representative.dim();
        assert_eq!(
            values.len(),
            dim,
            "unflatten: representative has {} scalars, got {}",
            dim,
            values.len()
        );
        let mut cursor = values.iter();
        representative.map(|_| match cursor.next() {
            Some(&v) => v,
            None => unreachable!("length checked above"),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::snv::{NullableSnv, Snv};
    use crate::{path, snv};

    #[test]
    fn flatten_orders_keys() {
        let v = snv!({ "b": 2, "a": [0, 1], "c": { "z": 4, "y": 3 } });
        assert_eq!(v.flatten(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn unflatten_inverts_flatten() {
        let v = snv!({ "x": 1.5, "y": [2, { "q": (-4), "p": 7 }], "z": [] });
        let rebuilt = Snv::unflatten(&v, &v.flatten());
        assert!(rebuilt.deep_equals(&v));
    }

    #[test]
    fn unflatten_roundtrips_nan_and_holes() {
        let v = Snv::seq([Snv::Scalar(f64::NAN), snv!(1)]);
        assert!(Snv::unflatten(&v, &v.flatten()).deep_equals(&v));

        let mut holes = NullableSnv::nulls_like(&snv!({ "a": 0, "b": 0 }));
        holes.set_scalar(&path!["b"], Some(2.0));
        assert!(NullableSnv::unflatten(&holes, &holes.flatten()).deep_equals(&holes));
    }

    #[test]
    fn unflatten_into_other_scalar_type() {
        let rep = snv!([0, 0]);
        let nullable = NullableSnv::unflatten(&rep, &[None, Some(3.0)]);
        assert_eq!(nullable.scalar_at(&path![1]), Some(3.0));
    }

    #[test]
    #[should_panic(expected = "unflatten")]
    fn unflatten_checks_length() {
        Snv::unflatten(&snv!([0, 0]), &[1.0]);
    }
}
