//! Pointwise vector-space arithmetic.
//!
//! [`Snv`] and [`NullableSnv`] get separate operator impls: the nullable
//! variants pay for a hole check on every scalar, the plain ones do not.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use super::{NullableSnv, Snv, Tree};

impl Add for &Snv {
    type Output = Snv;

    fn add(self, rhs: &Snv) -> Snv {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for &Snv {
    type Output = Snv;

    fn sub(self, rhs: &Snv) -> Snv {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Neg for &Snv {
    type Output = Snv;

    fn neg(self) -> Snv {
        self.map(|a| -a)
    }
}

impl Mul<f64> for &Snv {
    type Output = Snv;

    fn mul(self, k: f64) -> Snv {
        self.map(|a| k * a)
    }
}

impl Mul<&Snv> for f64 {
    type Output = Snv;

    fn mul(self, rhs: &Snv) -> Snv {
        rhs * self
    }
}

impl AddAssign<&Snv> for Snv {
    fn add_assign(&mut self, rhs: &Snv) {
        self.assert_congruent(rhs, "add_assign");
        fn go(a: &mut Snv, b: &Snv) {
            match (a, b) {
                (Tree::Scalar(x), Tree::Scalar(y)) => *x += *y,
                (Tree::Seq(xs), Tree::Seq(ys)) => {
                    for (x, y) in xs.iter_mut().zip(ys) {
                        go(x, y);
                    }
                }
                (Tree::Record(xs), Tree::Record(ys)) => {
                    for (x, y) in xs.values_mut().zip(ys.values()) {
                        go(x, y);
                    }
                }
                _ => unreachable!("congruence checked above"),
            }
        }
        go(self, rhs);
    }
}

fn lift(a: Option<f64>, b: Option<f64>, f: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        _ => None,
    }
}

impl Add for &NullableSnv {
    type Output = NullableSnv;

    fn add(self, rhs: &NullableSnv) -> NullableSnv {
        self.zip_with(rhs, |a, b| lift(a, b, |a, b| a + b))
    }
}

impl Sub for &NullableSnv {
    type Output = NullableSnv;

    fn sub(self, rhs: &NullableSnv) -> NullableSnv {
        self.zip_with(rhs, |a, b| lift(a, b, |a, b| a - b))
    }
}

impl Neg for &NullableSnv {
    type Output = NullableSnv;

    fn neg(self) -> NullableSnv {
        self.map(|a| a.map(|a| -a))
    }
}

impl Mul<f64> for &NullableSnv {
    type Output = NullableSnv;

    fn mul(self, k: f64) -> NullableSnv {
        self.map(|a| a.map(|a| k * a))
    }
}

/// Pointwise sum of congruent values; `None` when `items` is empty.
pub fn sum<'a>(items: impl IntoIterator<Item = &'a Snv>) -> Option<Snv> {
    let mut iter = items.into_iter();
    let mut total = iter.next()?.clone();
    for item in iter {
        total += item;
    }
    Some(total)
}

/// Null-propagating pointwise sum; `None` when `items` is empty.
pub fn sum_nullable<'a>(items: impl IntoIterator<Item = &'a NullableSnv>) -> Option<NullableSnv> {
    let mut iter = items.into_iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, item| &acc + item))
}
