//! Paths addressing locations inside structured numeric values.
//!
//! A [`Path`] is a sequence of [`Key`]s: sequence indices and record keys.
//! The empty path addresses the whole value.

use std::fmt;

use crate::snv::{Scalar, Tree};

/// One step of a [`Path`].
///
/// Indices order before names so that sorted path collections are stable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Key {
    /// Position in a sequence.
    Index(usize),
    /// Key of a record entry.
    Name(String),
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Integer literals default to `i32`; this keeps `path!["z", 0]` ergonomic.
impl From<i32> for Key {
    fn from(index: i32) -> Self {
        assert!(index >= 0, "path index must be non-negative, got {}", index);
        Key::Index(index as usize)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A sequence of keys followed from the root of a value.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Path(Vec<Key>);

impl Path {
    /// The empty path, addressing the whole value.
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }

    pub fn pop(&mut self) -> Option<Key> {
        self.0.pop()
    }

    /// This path extended by one key.
    pub fn child(&self, key: impl Into<Key>) -> Path {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Path(keys)
    }

    /// This path followed by all keys of `suffix`.
    pub fn join(&self, suffix: &Path) -> Path {
        let mut keys = Vec::with_capacity(self.len() + suffix.len());
        keys.extend_from_slice(&self.0);
        keys.extend_from_slice(&suffix.0);
        Path(keys)
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Path(keys)
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for key in &self.0 {
            write!(f, "/{}", key)?;
        }
        Ok(())
    }
}

/// Build a [`Path`] from indices and names.
///
/// ```
/// use vellum::{path, Key};
/// let p = path!["children", 2, "width"];
/// assert_eq!(p.keys()[1], Key::Index(2));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::root()
    };
    ($($key:expr),+ $(,)?) => {
        $crate::path::Path::from(vec![$($crate::path::Key::from($key)),+])
    };
}

impl<S: Scalar> Tree<S> {
    /// The sub-value at `path`, or `None` if the path leaves the value.
    pub fn try_get(&self, path: &Path) -> Option<&Tree<S>> {
        let mut node = self;
        for key in path.keys() {
            node = match (node, key) {
                (Tree::Seq(items), Key::Index(i)) => items.get(*i)?,
                (Tree::Record(fields), Key::Name(name)) => fields.get(name)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// The sub-value at `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not exist in this value.
    pub fn get(&self, path: &Path) -> &Tree<S> {
        match self.try_get(path) {
            Some(node) => node,
            None => panic!("path {} does not exist in value", path),
        }
    }

    /// Mutable access to the sub-value at `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not exist in this value.
    pub fn get_mut(&mut self, path: &Path) -> &mut Tree<S> {
        let mut node = self;
        for key in path.keys() {
            let child = match (node, key) {
                (Tree::Seq(items), Key::Index(i)) => items.get_mut(*i),
                (Tree::Record(fields), Key::Name(name)) => fields.get_mut(name),
                _ => None,
            };
            node = match child {
                Some(child) => child,
                None => panic!("path {} does not exist in value", path),
            };
        }
        node
    }

    /// Replace the sub-value at `path`.
    pub fn set(&mut self, path: &Path, value: Tree<S>) {
        *self.get_mut(path) = value;
    }

    /// The scalar at `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not exist or addresses a container.
    pub fn scalar_at(&self, path: &Path) -> S {
        match self.get(path) {
            Tree::Scalar(s) => *s,
            other => panic!("path {} addresses a {}, not a scalar", path, other.kind()),
        }
    }

    /// Overwrite the scalar at `path`.
    pub fn set_scalar(&mut self, path: &Path, value: S) {
        match self.get_mut(path) {
            Tree::Scalar(s) => *s = value,
            other => panic!("path {} addresses a {}, not a scalar", path, other.kind()),
        }
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.try_get(path).is_some()
    }
}
