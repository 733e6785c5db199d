//! Removing scalars from a value, and putting them back.
//!
//! [`Tree::prune_by`] drops every scalar rejected by a predicate together
//! with every container left without scalars. Sequences close up, so the
//! indices of later items shift. [`Tree::coprune_by`] reverses this: given a
//! value congruent to the pruned result, it rebuilds a value congruent to the
//! original, taking removed scalars from the original.

use std::collections::BTreeMap;

use super::{Scalar, Tree};
use crate::path::{Key, Path};

/// Whether `node` keeps at least one scalar under `keep`.
fn survives<S: Scalar>(node: &Tree<S>, path: &mut Path, keep: &mut impl FnMut(S, &Path) -> bool) -> bool {
    match node {
        Tree::Scalar(s) => keep(*s, path),
        Tree::Seq(items) => items.iter().enumerate().any(|(i, item)| {
            path.push(Key::Index(i));
            let found = survives(item, path, keep);
            path.pop();
            found
        }),
        Tree::Record(fields) => fields.iter().any(|(k, v)| {
            path.push(Key::Name(k.clone()));
            let found = survives(v, path, keep);
            path.pop();
            found
        }),
    }
}

impl<S: Scalar> Tree<S> {
    /// Drop empty sequences and records, keeping every scalar.
    pub fn prune(&self) -> Tree<S> {
        self.prune_by(|_, _| true)
    }

    /// Drop scalars for which `keep` is false and containers left empty.
    ///
    /// A scalar at the root is returned unchanged. A root container that
    /// loses everything becomes an empty container of the same kind.
    pub fn prune_by(&self, mut keep: impl FnMut(S, &Path) -> bool) -> Tree<S> {
        fn go<S: Scalar>(
            node: &Tree<S>,
            path: &mut Path,
            keep: &mut impl FnMut(S, &Path) -> bool,
        ) -> Option<Tree<S>> {
            match node {
                Tree::Scalar(s) => keep(*s, path).then_some(Tree::Scalar(*s)),
                Tree::Seq(items) => {
                    let mut out = Vec::new();
                    for (i, item) in items.iter().enumerate() {
                        path.push(Key::Index(i));
                        out.extend(go(item, path, keep));
                        path.pop();
                    }
                    (!out.is_empty()).then_some(Tree::Seq(out))
                }
                Tree::Record(fields) => {
                    let mut out = BTreeMap::new();
                    for (k, v) in fields {
                        path.push(Key::Name(k.clone()));
                        if let Some(pruned) = go(v, path, keep) {
                            out.insert(k.clone(), pruned);
                        }
                        path.pop();
                    }
                    (!out.is_empty()).then_some(Tree::Record(out))
                }
            }
        }

        match self {
            Tree::Scalar(_) => self.clone(),
            Tree::Seq(_) => go(self, &mut Path::root(), &mut keep).unwrap_or(Tree::Seq(Vec::new())),
            Tree::Record(_) => {
                go(self, &mut Path::root(), &mut keep).unwrap_or(Tree::Record(BTreeMap::new()))
            }
        }
    }

    /// Inverse of [`Tree::prune`] with respect to `self`.
    pub fn coprune(&self, pruned: &Tree<S>) -> Tree<S> {
        self.coprune_by(|_, _| true, pruned)
    }

    /// Inverse of [`Tree::prune_by`]: `self` is the original value and
    /// `pruned` is congruent to `self.prune_by(keep)`.
    ///
    /// The result is congruent to `self`, agrees with `pruned` at every kept
    /// position and with `self` everywhere else, so
    /// `self.coprune_by(keep, &self.prune_by(keep))` deep-equals `self`.
    ///
    /// # Panics
    ///
    /// Panics if `pruned` does not have the shape of the pruned original.
    pub fn coprune_by(&self, mut keep: impl FnMut(S, &Path) -> bool, pruned: &Tree<S>) -> Tree<S> {
        fn go<S: Scalar>(
            original: &Tree<S>,
            pruned: &Tree<S>,
            path: &mut Path,
            keep: &mut impl FnMut(S, &Path) -> bool,
        ) -> Tree<S> {
            match (original, pruned) {
                (Tree::Scalar(_), Tree::Scalar(s)) => Tree::Scalar(*s),
                (Tree::Seq(items), Tree::Seq(kept)) => {
                    let mut next = kept.iter();
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        path.push(Key::Index(i));
                        if survives(item, path, keep) {
                            match next.next() {
                                Some(p) => out.push(go(item, p, path, keep)),
                                None => panic!("coprune: pruned sequence at {} is too short", path),
                            }
                        } else {
                            out.push(item.clone());
                        }
                        path.pop();
                    }
                    assert!(
                        next.next().is_none(),
                        "coprune: pruned sequence at {} is too long",
                        path
                    );
                    Tree::Seq(out)
                }
                (Tree::Record(fields), Tree::Record(kept)) => {
                    let mut used = 0;
                    let mut out = BTreeMap::new();
                    for (k, v) in fields {
                        path.push(Key::Name(k.clone()));
                        let value = if survives(v, path, keep) {
                            used += 1;
                            match kept.get(k) {
                                Some(p) => go(v, p, path, keep),
                                None => panic!("coprune: pruned value lacks {}", path),
                            }
                        } else {
                            v.clone()
                        };
                        out.insert(k.clone(), value);
                        path.pop();
                    }
                    assert_eq!(
                        used,
                        kept.len(),
                        "coprune: pruned record at {} has unexpected keys",
                        path
                    );
                    Tree::Record(out)
                }
                (o, p) => panic!(
                    "coprune: expected {} at {}, found {}",
                    o.kind(),
                    path,
                    p.kind()
                ),
            }
        }

        go(self, pruned, &mut Path::root(), &mut keep)
    }
}
