//! Finite sets of non-empty paths, stored as a trie.

use std::collections::BTreeMap;

use crate::path::{Key, Path};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Node {
    terminal: bool,
    children: BTreeMap<Key, Node>,
}

/// A set of non-empty [`Path`]s.
///
/// Membership costs one map lookup per key; paths sharing a prefix share
/// storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathSet {
    root: BTreeMap<Key, Node>,
    len: usize,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add `path`; returns `false` if it was already present.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty.
    pub fn insert(&mut self, path: &Path) -> bool {
        let Some((last, prefix)) = path.keys().split_last() else {
            panic!("path sets hold non-empty paths only");
        };
        let mut level = &mut self.root;
        for key in prefix {
            level = &mut level.entry(key.clone()).or_default().children;
        }
        let node = level.entry(last.clone()).or_default();
        let added = !node.terminal;
        node.terminal = true;
        if added {
            self.len += 1;
        }
        added
    }

    pub fn contains(&self, path: &Path) -> bool {
        let Some((last, prefix)) = path.keys().split_last() else {
            return false;
        };
        let mut level = &self.root;
        for key in prefix {
            match level.get(key) {
                Some(node) => level = &node.children,
                None => return false,
            }
        }
        level.get(last).map_or(false, |node| node.terminal)
    }

    /// True if some member of the set starts with `prefix`.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        if prefix.is_empty() {
            return !self.is_empty();
        }
        // Every node lies on the way to some member.
        let mut level = &self.root;
        for key in prefix.keys() {
            match level.get(key) {
                Some(node) => level = &node.children,
                None => return false,
            }
        }
        true
    }

    /// All members in key order.
    pub fn to_paths(&self) -> Vec<Path> {
        fn go(level: &BTreeMap<Key, Node>, prefix: &mut Path, out: &mut Vec<Path>) {
            for (key, node) in level {
                prefix.push(key.clone());
                if node.terminal {
                    out.push(prefix.clone());
                }
                go(&node.children, prefix, out);
                prefix.pop();
            }
        }
        let mut out = Vec::with_capacity(self.len);
        go(&self.root, &mut Path::root(), &mut out);
        out
    }
}

impl<'a> FromIterator<&'a Path> for PathSet {
    fn from_iter<I: IntoIterator<Item = &'a Path>>(iter: I) -> Self {
        let mut set = PathSet::new();
        set.extend(iter);
        set
    }
}

impl FromIterator<Path> for PathSet {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        let mut set = PathSet::new();
        for path in iter {
            set.insert(&path);
        }
        set
    }
}

impl<'a> Extend<&'a Path> for PathSet {
    fn extend<I: IntoIterator<Item = &'a Path>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn contains_exactly_inserted_paths() {
        let set: PathSet = [path!["a"], path!["a", 0], path!["a", "b"], path!["c"]]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 4);
        assert!(set.contains(&path!["a"]));
        assert!(set.contains(&path!["a", 0]));
        assert!(set.contains(&path!["c"]));
        assert!(!set.contains(&path!["a", 1]));
        assert!(!set.contains(&path!["b"]));
        assert!(!set.contains(&Path::root()));
    }

    #[test]
    fn prefixes_are_not_members() {
        let set: PathSet = [path!["a", "b"], path!["a", "c"], path!["a", "b", "c"]]
            .into_iter()
            .collect();
        assert!(!set.contains(&path!["a"]));
        assert!(set.has_prefix(&path!["a"]));
        assert!(set.contains(&path!["a", "b"]));
        assert!(!set.has_prefix(&path!["b"]));
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut set = PathSet::new();
        assert!(set.insert(&path!["x", 1]));
        assert!(!set.insert(&path!["x", 1]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn to_paths_lists_members_in_order() {
        let paths = vec![path!["b"], path!["a", "a", "a"], path!["a"], path!["a", "a"]];
        let set: PathSet = paths.iter().collect();
        assert_eq!(
            set.to_paths(),
            vec![path!["a"], path!["a", "a"], path!["a", "a", "a"], path!["b"]]
        );
        assert!(PathSet::new().to_paths().is_empty());
    }

    #[test]
    #[should_panic(expected = "non-empty")]
    fn rejects_root_path() {
        PathSet::new().insert(&Path::root());
    }
}
