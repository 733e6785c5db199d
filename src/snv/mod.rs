//! Structured numeric values (SNVs).
//!
//! A [`Tree`] is a scalar, an ordered sequence of trees, or a record mapping
//! string keys to trees. Two trees are *congruent* when they have the same
//! recursive shape; the scalars may differ. All trees congruent to a given
//! representative form a finite-dimensional vector space, isomorphic to
//! `R^n` through [`Tree::flatten`] / [`Tree::unflatten`].
//!
//! Two scalar types are used throughout:
//!
//! * [`Snv`] (`Tree<f64>`): a fully specified value.
//! * [`NullableSnv`] (`Tree<Option<f64>>`): a partially specified value whose
//!   `None` scalars are holes. Holes propagate through arithmetic.

use std::collections::BTreeMap;
use std::fmt;

use crate::path::{Key, Path};

mod flatten;
mod ops;
mod prune;

pub use ops::{sum, sum_nullable};

/// Scalar payload of a [`Tree`].
pub trait Scalar: Copy + fmt::Debug + Send + Sync + 'static {
    /// Deep-equality on scalars: NaN equals NaN, `0.0` equals `-0.0`.
    fn same(&self, other: &Self) -> bool;

    /// True for the hole marker of partially specified values.
    fn is_hole(&self) -> bool;
}

impl Scalar for f64 {
    fn same(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }

    fn is_hole(&self) -> bool {
        false
    }
}

impl Scalar for Option<f64> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn is_hole(&self) -> bool {
        self.is_none()
    }
}

/// A nested container of scalars.
///
/// Record keys are kept in a `BTreeMap`, which gives the canonical key order
/// used for flattening.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Tree<S> {
    Scalar(S),
    Seq(Vec<Tree<S>>),
    Record(BTreeMap<String, Tree<S>>),
}

/// A fully specified structured numeric value.
pub type Snv = Tree<f64>;

/// A structured numeric value whose scalars may be unset.
pub type NullableSnv = Tree<Option<f64>>;

/// Describes how two values fail to be congruent.
#[derive(Clone, Debug, PartialEq)]
pub enum StructureError {
    /// Scalar, sequence and record met at the same location.
    KindMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },
    /// Two sequences of different lengths.
    LengthMismatch {
        path: Path,
        expected: usize,
        found: usize,
    },
    /// Two records with different key sets.
    KeyMismatch {
        path: Path,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::KindMismatch {
                path,
                expected,
                found,
            } => write!(f, "structural mismatch at {}: expected {}, found {}", path, expected, found),
            StructureError::LengthMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "structural mismatch at {}: expected sequence of length {}, found length {}",
                path, expected, found
            ),
            StructureError::KeyMismatch {
                path,
                missing,
                unexpected,
            } => write!(
                f,
                "structural mismatch at {}: missing keys {:?}, unexpected keys {:?}",
                path, missing, unexpected
            ),
        }
    }
}

impl std::error::Error for StructureError {}

impl<S: Scalar> Tree<S> {
    pub fn seq(items: impl IntoIterator<Item = Tree<S>>) -> Self {
        Tree::Seq(items.into_iter().collect())
    }

    pub fn record<K: Into<String>>(entries: impl IntoIterator<Item = (K, Tree<S>)>) -> Self {
        Tree::Record(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A tree congruent to `representative` with every scalar set to `value`.
    pub fn filled_like<R: Scalar>(representative: &Tree<R>, value: S) -> Self {
        representative.map(|_| value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Tree::Scalar(_) => "scalar",
            Tree::Seq(_) => "sequence",
            Tree::Record(_) => "record",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Tree::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<S> {
        match self {
            Tree::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Number of scalar positions.
    pub fn dim(&self) -> usize {
        match self {
            Tree::Scalar(_) => 1,
            Tree::Seq(items) => items.iter().map(Tree::dim).sum(),
            Tree::Record(fields) => fields.values().map(Tree::dim).sum(),
        }
    }

    /// Substitute every scalar.
    pub fn map<T: Scalar>(&self, mut f: impl FnMut(S) -> T) -> Tree<T> {
        fn go<S: Scalar, T: Scalar>(node: &Tree<S>, f: &mut impl FnMut(S) -> T) -> Tree<T> {
            match node {
                Tree::Scalar(s) => Tree::Scalar(f(*s)),
                Tree::Seq(items) => Tree::Seq(items.iter().map(|item| go(item, f)).collect()),
                Tree::Record(fields) => Tree::Record(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), go(v, f)))
                        .collect(),
                ),
            }
        }
        go(self, &mut f)
    }

    /// Substitute every scalar, with access to its path.
    pub fn map_with_path<T: Scalar>(&self, mut f: impl FnMut(S, &Path) -> T) -> Tree<T> {
        fn go<S: Scalar, T: Scalar>(
            node: &Tree<S>,
            path: &mut Path,
            f: &mut impl FnMut(S, &Path) -> T,
        ) -> Tree<T> {
            match node {
                Tree::Scalar(s) => Tree::Scalar(f(*s, path)),
                Tree::Seq(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        path.push(Key::Index(i));
                        out.push(go(item, path, f));
                        path.pop();
                    }
                    Tree::Seq(out)
                }
                Tree::Record(fields) => {
                    let mut out = BTreeMap::new();
                    for (k, v) in fields {
                        path.push(Key::Name(k.clone()));
                        out.insert(k.clone(), go(v, path, f));
                        path.pop();
                    }
                    Tree::Record(out)
                }
            }
        }
        go(self, &mut Path::root(), &mut f)
    }

    /// Combine two congruent trees scalar by scalar.
    ///
    /// # Panics
    ///
    /// Panics if the trees are not congruent.
    pub fn zip_with<T: Scalar, U: Scalar>(
        &self,
        other: &Tree<T>,
        mut f: impl FnMut(S, T) -> U,
    ) -> Tree<U> {
        self.assert_congruent(other, "zip_with");
        fn go<S: Scalar, T: Scalar, U: Scalar>(
            a: &Tree<S>,
            b: &Tree<T>,
            f: &mut impl FnMut(S, T) -> U,
        ) -> Tree<U> {
            match (a, b) {
                (Tree::Scalar(x), Tree::Scalar(y)) => Tree::Scalar(f(*x, *y)),
                (Tree::Seq(xs), Tree::Seq(ys)) => {
                    Tree::Seq(xs.iter().zip(ys).map(|(x, y)| go(x, y, f)).collect())
                }
                (Tree::Record(xs), Tree::Record(ys)) => Tree::Record(
                    xs.iter()
                        .zip(ys.values())
                        .map(|((k, x), y)| (k.clone(), go(x, y, f)))
                        .collect(),
                ),
                _ => unreachable!("congruence checked above"),
            }
        }
        go(self, other, &mut f)
    }

    /// Locate the first structural difference from `other`, if any.
    pub fn check_congruent<T: Scalar>(&self, other: &Tree<T>) -> Result<(), StructureError> {
        fn go<S: Scalar, T: Scalar>(
            a: &Tree<S>,
            b: &Tree<T>,
            path: &mut Path,
        ) -> Result<(), StructureError> {
            match (a, b) {
                (Tree::Scalar(_), Tree::Scalar(_)) => Ok(()),
                (Tree::Seq(xs), Tree::Seq(ys)) => {
                    if xs.len() != ys.len() {
                        return Err(StructureError::LengthMismatch {
                            path: path.clone(),
                            expected: xs.len(),
                            found: ys.len(),
                        });
                    }
                    for (i, (x, y)) in xs.iter().zip(ys).enumerate() {
                        path.push(Key::Index(i));
                        go(x, y, path)?;
                        path.pop();
                    }
                    Ok(())
                }
                (Tree::Record(xs), Tree::Record(ys)) => {
                    if xs.len() != ys.len() || !xs.keys().eq(ys.keys()) {
                        return Err(StructureError::KeyMismatch {
                            path: path.clone(),
                            missing: xs.keys().filter(|k| !ys.contains_key(*k)).cloned().collect(),
                            unexpected: ys
                                .keys()
                                .filter(|k| !xs.contains_key(*k))
                                .cloned()
                                .collect(),
                        });
                    }
                    for ((k, x), y) in xs.iter().zip(ys.values()) {
                        path.push(Key::Name(k.clone()));
                        go(x, y, path)?;
                        path.pop();
                    }
                    Ok(())
                }
                _ => Err(StructureError::KindMismatch {
                    path: path.clone(),
                    expected: a.kind(),
                    found: b.kind(),
                }),
            }
        }
        go(self, other, &mut Path::root())
    }

    pub fn is_congruent<T: Scalar>(&self, other: &Tree<T>) -> bool {
        self.check_congruent(other).is_ok()
    }

    /// # Panics
    ///
    /// Panics with the first mismatch, prefixed by `context`.
    pub fn assert_congruent<T: Scalar>(&self, other: &Tree<T>, context: &str) {
        if let Err(err) = self.check_congruent(other) {
            panic!("{}: {}", context, err);
        }
    }

    /// Structural equality using [`Scalar::same`] on scalars.
    pub fn deep_equals(&self, other: &Tree<S>) -> bool {
        match (self, other) {
            (Tree::Scalar(a), Tree::Scalar(b)) => a.same(b),
            (Tree::Seq(xs), Tree::Seq(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.deep_equals(y))
            }
            (Tree::Record(xs), Tree::Record(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|((ka, a), (kb, b))| ka == kb && a.deep_equals(b))
            }
            _ => false,
        }
    }
}

impl Tree<f64> {
    /// A tree congruent to `representative` filled with zeros.
    pub fn zeros_like<R: Scalar>(representative: &Tree<R>) -> Snv {
        Tree::filled_like(representative, 0.0)
    }

    /// Every scalar as a set value.
    pub fn to_nullable(&self) -> NullableSnv {
        self.map(Some)
    }
}

impl Tree<Option<f64>> {
    /// A tree congruent to `representative` in which every scalar is a hole.
    pub fn nulls_like<R: Scalar>(representative: &Tree<R>) -> NullableSnv {
        Tree::filled_like(representative, None)
    }

    /// Replace every hole by `value`.
    pub fn fill_holes(&self, value: f64) -> Snv {
        self.map(|s| s.unwrap_or(value))
    }

    /// Replace every hole by the scalar at the same position in `fallback`.
    pub fn fill_from(&self, fallback: &Snv) -> Snv {
        self.zip_with(fallback, |s, f| s.unwrap_or(f))
    }

    pub fn has_holes(&self) -> bool {
        self.flatten().iter().any(Option::is_none)
    }
}

impl From<f64> for Snv {
    fn from(value: f64) -> Self {
        Tree::Scalar(value)
    }
}

impl From<Vec<Snv>> for Snv {
    fn from(items: Vec<Snv>) -> Self {
        Tree::Seq(items)
    }
}

/// Build an [`Snv`] with JSON-like syntax.
///
/// Negative numbers and other multi-token scalars need parentheses.
///
/// ```
/// use vellum::snv;
/// let v = snv!({ "x": 0, "z": [(-3.0), 7] });
/// assert_eq!(v.dim(), 3);
/// ```
#[macro_export]
macro_rules! snv {
    ([ $($item:tt),* $(,)? ]) => {
        $crate::snv::Tree::<f64>::Seq(vec![ $( $crate::snv!($item) ),* ])
    };
    ({ $($key:literal : $value:tt),* $(,)? }) => {
        $crate::snv::Tree::<f64>::Record({
            #[allow(unused_mut)]
            let mut fields = ::std::collections::BTreeMap::new();
            $( fields.insert(::std::string::String::from($key), $crate::snv!($value)); )*
            fields
        })
    };
    ($value:expr) => {
        $crate::snv::Tree::<f64>::Scalar(($value) as f64)
    };
}
