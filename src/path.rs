//! Addresses into schema trees and value trees.
//!
//! A [`ConfPath`] is an ordered list of segments. The segment `".."` means "up":
//! when two paths are joined, every leading `".."` of the suffix cancels the last
//! segment of the prefix. Over-navigating past the root keeps the surplus `".."`
//! segments instead of failing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The segment that cancels its predecessor when paths are joined.
pub const UP: &str = "..";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ConfPath {
    segments: Vec<String>,
}

impl ConfPath {
    /// The empty path, addressing the root of a tree.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// A single `".."` segment.
    pub fn up() -> Self {
        Self::new([UP])
    }

    /// Parse a slash-separated path. Empty segments are skipped, so `"/a//b/"`
    /// is the same as `"a/b"`.
    pub fn parse(s: &str) -> Self {
        Self::new(s.split('/').filter(|seg| !seg.is_empty()))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Append `suffix`, letting its leading `".."` segments eat into `self`.
    pub fn join(&self, suffix: &ConfPath) -> ConfPath {
        let mut head = self.segments.clone();
        let mut tail = suffix.segments.as_slice();
        while let Some((first, rest)) = tail.split_first()
            && first == UP
            && !head.is_empty()
        {
            head.pop();
            tail = rest;
        }
        head.extend(tail.iter().cloned());
        ConfPath { segments: head }
    }

    /// Append a single segment (`".."` navigates up).
    pub fn child(&self, name: &str) -> ConfPath {
        self.join(&ConfPath::new([name]))
    }

    pub fn parent(&self) -> Option<ConfPath> {
        self.split_last().map(|(parent, _)| parent)
    }

    /// Split into everything but the last segment, and the last segment.
    pub fn split_last(&self) -> Option<(ConfPath, &str)> {
        let (last, init) = self.segments.split_last()?;
        Some((ConfPath::new(init.iter().cloned()), last.as_str()))
    }

    /// Split into the first segment and everything after it.
    pub fn split_first(&self) -> Option<(&str, ConfPath)> {
        let (first, rest) = self.segments.split_first()?;
        Some((first.as_str(), ConfPath::new(rest.iter().cloned())))
    }

    /// Every non-empty prefix, shortest first. The last item is the path itself.
    pub fn prefixes(&self) -> impl Iterator<Item = ConfPath> + '_ {
        (1..=self.segments.len()).map(|n| ConfPath::new(self.segments[..n].iter().cloned()))
    }

    pub fn starts_with(&self, prefix: &ConfPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

impl fmt::Display for ConfPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for ConfPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for ConfPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ConfPath> for String {
    fn from(path: ConfPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(segments: &[&str]) -> ConfPath {
        ConfPath::new(segments.iter().copied())
    }

    #[test]
    fn join_without_up_concatenates() {
        assert_eq!(p(&["a", "b"]).join(&p(&["c"])), p(&["a", "b", "c"]));
    }

    #[test]
    fn join_cancels_leading_up_segments() {
        let joined = p(&["a", "b", "c"]).join(&p(&["..", "..", "e"]));
        assert_eq!(joined, p(&["a", "e"]));
    }

    #[test]
    fn join_past_root_keeps_surplus_up() {
        let joined = p(&["a"]).join(&p(&["..", "..", "e"]));
        assert_eq!(joined, p(&["..", "e"]));
    }

    #[test]
    fn up_inside_suffix_is_not_cancelled() {
        let joined = p(&["a"]).join(&p(&["b", "..", "c"]));
        assert_eq!(joined, p(&["a", "b", "..", "c"]));
    }

    #[test]
    fn child_up_goes_to_parent() {
        assert_eq!(p(&["a", "b"]).child(".."), p(&["a"]));
    }

    #[test]
    fn parse_skips_empty_segments() {
        assert_eq!(ConfPath::parse("/a//b/"), p(&["a", "b"]));
        assert!(ConfPath::parse("").is_empty());
    }

    #[test]
    fn display_is_slash_joined() {
        assert_eq!(p(&["pyproject.toml", "tool", "x"]).to_string(), "pyproject.toml/tool/x");
    }

    #[test]
    fn split_first_and_last() {
        let path = p(&["a", "b", "c"]);
        let (head, tail) = path.split_first().unwrap();
        assert_eq!(head, "a");
        assert_eq!(tail, p(&["b", "c"]));
        let (init, last) = path.split_last().unwrap();
        assert_eq!(init, p(&["a", "b"]));
        assert_eq!(last, "c");
        assert!(ConfPath::root().split_last().is_none());
    }

    #[test]
    fn prefixes_are_shortest_first() {
        let all: Vec<_> = p(&["a", "b"]).prefixes().collect();
        assert_eq!(all, vec![p(&["a"]), p(&["a", "b"])]);
    }

    #[test]
    fn serde_uses_string_form() {
        let path = p(&["a", "b"]);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""a/b""#);
        let back: ConfPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    proptest! {
        #[test]
        fn joining_plain_paths_preserves_length(
            a in proptest::collection::vec("[a-z]{1,4}", 0..5),
            b in proptest::collection::vec("[a-z]{1,4}", 0..5),
        ) {
            let joined = ConfPath::new(a.clone()).join(&ConfPath::new(b.clone()));
            prop_assert_eq!(joined.len(), a.len() + b.len());
        }

        #[test]
        fn child_then_up_is_identity(
            a in proptest::collection::vec("[a-z]{1,4}", 0..5),
            name in "[a-z]{1,4}",
        ) {
            let path = ConfPath::new(a);
            prop_assert_eq!(path.child(&name).child(UP), path);
        }
    }
}
