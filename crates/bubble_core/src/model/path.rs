//! Materialized bubble path model.
//!
//! # Responsibility
//! - Validate slash-delimited bubble paths at construction time.
//! - Derive depth, parent path and ancestry from the path string alone.
//!
//! # Invariants
//! - A valid path is non-empty, starts with `/`, never ends with `/` and has
//!   no empty segment, so every ancestor prefix is itself a valid path.
//! - `depth == number of '/' characters`, so root bubbles have depth 1.
//! - Descendant tests are segment-aware: `/a/b` is not an ancestor of `/a/bc`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Path separator used by every bubble path.
pub const PATH_SEPARATOR: char = '/';

/// Malformed path syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path is empty.
    Empty,
    /// Path does not start with `/`.
    MissingLeadingSlash(String),
    /// Path ends with `/` (empty last segment).
    TrailingSlash(String),
    /// Path contains `//` (empty interior segment).
    EmptySegment(String),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "bubble path must not be empty"),
            Self::MissingLeadingSlash(path) => {
                write!(f, "bubble path must start with '/': `{path}`")
            }
            Self::TrailingSlash(path) => write!(f, "bubble path must not end with '/': `{path}`"),
            Self::EmptySegment(path) => {
                write!(f, "bubble path must not contain empty segments: `{path}`")
            }
        }
    }
}

impl Error for PathError {}

/// Returns the depth of `path`, i.e. the count of `/` characters.
///
/// # Errors
/// - Returns [`PathError`] when `path` is empty, lacks the leading `/`,
///   ends with `/` or contains `//`.
pub fn depth_of(path: &str) -> Result<u32, PathError> {
    validate(path)?;
    Ok(path.matches(PATH_SEPARATOR).count() as u32)
}

/// Returns the substring before the last `/`.
///
/// An empty result means `path` is a root and needs no parent.
pub fn parent_path_of(path: &str) -> &str {
    match path.rfind(PATH_SEPARATOR) {
        Some(index) => &path[..index],
        None => "",
    }
}

/// Returns whether `candidate` equals `ancestor` or lies under it.
pub fn is_descendant(ancestor: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// Replaces the leading `old_prefix` of `path` with `new_prefix`.
///
/// Callers must only pass paths for which `is_descendant(old_prefix, path)`
/// holds; other paths are returned unchanged.
pub fn rewrite_prefix(path: &str, old_prefix: &str, new_prefix: &str) -> String {
    if !is_descendant(old_prefix, path) {
        return path.to_string();
    }
    format!("{new_prefix}{}", &path[old_prefix.len()..])
}

fn validate(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with(PATH_SEPARATOR) {
        return Err(PathError::MissingLeadingSlash(path.to_string()));
    }
    if path.ends_with(PATH_SEPARATOR) {
        return Err(PathError::TrailingSlash(path.to_string()));
    }
    if path.contains("//") {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(())
}

/// Validated bubble path.
///
/// Construction goes through [`BubblePath::parse`], so every value in memory
/// already satisfies the syntax invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BubblePath(String);

impl BubblePath {
    /// Parses and validates a raw path string.
    pub fn parse(value: impl Into<String>) -> Result<Self, PathError> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of segments; roots have depth 1.
    pub fn depth(&self) -> u32 {
        self.0.matches(PATH_SEPARATOR).count() as u32
    }

    pub fn is_root(&self) -> bool {
        self.depth() == 1
    }

    /// Parent path, or `None` for root bubbles.
    pub fn parent(&self) -> Option<BubblePath> {
        let parent = parent_path_of(&self.0);
        if parent.is_empty() {
            None
        } else {
            Some(Self(parent.to_string()))
        }
    }

    /// Last segment of the path.
    pub fn leaf_name(&self) -> &str {
        let index = self.0.rfind(PATH_SEPARATOR).unwrap_or(0);
        &self.0[index + 1..]
    }

    /// Returns whether `self` equals `other` or is one of its ancestors.
    pub fn contains(&self, other: &BubblePath) -> bool {
        is_descendant(&self.0, &other.0)
    }

    /// Moves `self` from under `old_prefix` to under `new_prefix`.
    ///
    /// Returns `None` when `self` is not inside `old_prefix`.
    pub fn rebase(&self, old_prefix: &BubblePath, new_prefix: &BubblePath) -> Option<BubblePath> {
        if !old_prefix.contains(self) {
            return None;
        }
        Some(Self(rewrite_prefix(&self.0, &old_prefix.0, &new_prefix.0)))
    }
}

impl Display for BubblePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BubblePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BubblePath> for String {
    fn from(value: BubblePath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_separators() {
        assert_eq!(depth_of("/ws1").unwrap(), 1);
        assert_eq!(depth_of("/ws1/A").unwrap(), 2);
        assert_eq!(depth_of("/ws1/A/B/C").unwrap(), 4);
    }

    #[test]
    fn depth_rejects_malformed_paths() {
        assert_eq!(depth_of(""), Err(PathError::Empty));
        assert!(matches!(
            depth_of("ws1/A"),
            Err(PathError::MissingLeadingSlash(_))
        ));
        assert!(matches!(depth_of("/ws1/"), Err(PathError::TrailingSlash(_))));
        assert!(matches!(depth_of("/"), Err(PathError::TrailingSlash(_))));
        assert!(matches!(
            depth_of("/a//b"),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn parent_of_valid_path_is_valid() {
        assert!(BubblePath::parse("/a//b").is_err());

        let mut current = BubblePath::parse("/ws1/A/B/C").unwrap();
        while let Some(parent) = current.parent() {
            assert_eq!(BubblePath::parse(parent.as_str()).unwrap(), parent);
            assert_eq!(parent.depth() + 1, current.depth());
            current = parent;
        }
        assert!(current.is_root());
    }

    #[test]
    fn parent_of_root_is_empty() {
        assert_eq!(parent_path_of("/ws1"), "");
        assert_eq!(parent_path_of("/ws1/A/B"), "/ws1/A");
    }

    #[test]
    fn descendant_test_respects_segment_boundaries() {
        assert!(is_descendant("/a/b", "/a/b"));
        assert!(is_descendant("/a/b", "/a/b/c"));
        assert!(!is_descendant("/a/b", "/a/bc"));
        assert!(!is_descendant("/a/b/c", "/a/b"));
    }

    #[test]
    fn rewrite_prefix_replaces_leading_segment_only() {
        assert_eq!(rewrite_prefix("/a/b/c", "/a/b", "/x"), "/x/c");
        assert_eq!(rewrite_prefix("/a/b", "/a/b", "/a/x"), "/a/x");
        assert_eq!(rewrite_prefix("/a/bc", "/a/b", "/x"), "/a/bc");
    }

    #[test]
    fn bubble_path_exposes_parent_and_leaf() {
        let path = BubblePath::parse("/ws1/A/B").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.leaf_name(), "B");
        assert_eq!(path.parent().unwrap().as_str(), "/ws1/A");
        assert!(BubblePath::parse("/ws1").unwrap().parent().is_none());
        assert!(BubblePath::parse("/ws1").unwrap().is_root());
        assert!(!path.is_root());
    }

    #[test]
    fn rebase_keeps_depth_consistent() {
        let old = BubblePath::parse("/a/b").unwrap();
        let new = BubblePath::parse("/z").unwrap();
        let child = BubblePath::parse("/a/b/c/d").unwrap();

        let moved = child.rebase(&old, &new).unwrap();
        assert_eq!(moved.as_str(), "/z/c/d");
        assert_eq!(moved.depth(), depth_of(moved.as_str()).unwrap());
        assert!(BubblePath::parse("/a/c").unwrap().rebase(&old, &new).is_none());
    }

    #[test]
    fn deserialize_rejects_invalid_path() {
        let ok: BubblePath = serde_json::from_str("\"/ws1/A\"").unwrap();
        assert_eq!(ok.as_str(), "/ws1/A");
        assert!(serde_json::from_str::<BubblePath>("\"/ws1/\"").is_err());
    }
}
