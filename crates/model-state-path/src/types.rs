//! Type definitions for state paths.

use std::fmt;

use crate::{escape_component, PathError};

/// A step in a state path.
///
/// Either an object key (a model field name) or an array index (a position in
/// an array model's `list`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Object property name.
    Key(String),
    /// Array position.
    Index(usize),
}

impl PathStep {
    /// The key, if this step addresses an object property.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathStep::Key(key) => Some(key),
            PathStep::Index(_) => None,
        }
    }

    /// The array index, if this step addresses an array element.
    ///
    /// A key that is a canonical non-negative integer (see
    /// [`is_valid_index`](crate::is_valid_index)) also counts as an index.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathStep::Index(i) => Some(*i),
            PathStep::Key(key) if crate::is_valid_index(key) => key.parse().ok(),
            PathStep::Key(_) => None,
        }
    }

    /// The step rendered as an object key.
    pub fn to_key(&self) -> String {
        match self {
            PathStep::Key(key) => key.clone(),
            PathStep::Index(i) => i.to_string(),
        }
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_string())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        PathStep::Key(key)
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => f.write_str(&escape_component(key)),
            PathStep::Index(i) => write!(f, "{i}"),
        }
    }
}

/// An immutable path from the root of a state tree to one of its subtrees.
///
/// Paths are values: [`Path::child`] returns a new path and never mutates the
/// receiver, so a path captured by a closure stays valid while siblings are
/// built from the same parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathStep>);

impl Path {
    /// The empty path, addressing the whole tree.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A new path with `step` appended.
    #[must_use]
    pub fn child(&self, step: impl Into<PathStep>) -> Path {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step.into());
        Path(steps)
    }

    /// A new path with every step of `tail` appended.
    #[must_use]
    pub fn join(&self, tail: &Path) -> Path {
        let mut steps = self.0.clone();
        steps.extend_from_slice(&tail.0);
        Path(steps)
    }

    /// The parent path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NoParent`] for the root path.
    pub fn parent(&self) -> Result<Path, PathError> {
        match self.0.split_last() {
            Some((_, init)) => Ok(Path(init.to_vec())),
            None => Err(PathError::NoParent),
        }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathStep> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this path addresses the whole tree.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Whether this path is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.starts_with(self)
    }

    /// Format as an RFC 6901 JSON Pointer (`""` for the root).
    pub fn to_pointer(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 8);
        for step in &self.0 {
            out.push('/');
            out.push_str(&step.to_string());
        }
        out
    }
}

impl fmt::Display for Path {
    /// Same as [`Path::to_pointer`], except the root renders as `/`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        f.write_str(&self.to_pointer())
    }
}

impl From<Vec<PathStep>> for Path {
    fn from(steps: Vec<PathStep>) -> Self {
        Path(steps)
    }
}

impl FromIterator<PathStep> for Path {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathStep;
    type IntoIter = std::slice::Iter<'a, PathStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
