//! Bare and qualified item identifiers.
//!
//! Similarity files name items by filename only, while the rest of the
//! service addresses them by their path under the logo root. A
//! [`PartitionPrefix`] converts between the two forms for one partition.

use std::fmt;

/// Directory prefix shared by every qualified identifier of a partition.
///
/// Always ends with a single `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionPrefix(String);

impl PartitionPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        prefix.push('/');
        Self(prefix)
    }

    /// Prefix made of `root` followed by one partition directory.
    pub fn join(root: &str, dir: &str) -> Self {
        let root = root.trim_end_matches('/');
        let dir = dir.trim_matches('/');
        if root.is_empty() {
            Self::new(dir)
        } else {
            Self::new(format!("{root}/{dir}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualified form of `ident`.
    ///
    /// Identifiers already under this prefix are returned as they are, anything
    /// else loses its directory components and is re-rooted here.
    pub fn qualify(&self, ident: &str) -> String {
        if self.contains(ident) {
            return ident.to_string();
        }
        format!("{}{}", self.0, bare(ident))
    }

    /// Bare form of `ident`, the inverse of [`PartitionPrefix::qualify`].
    pub fn bare<'a>(&self, ident: &'a str) -> &'a str {
        match ident.strip_prefix(&self.0) {
            Some(rest) if !rest.contains('/') => rest,
            _ => bare(ident),
        }
    }

    /// Whether `ident` is a qualified identifier of this partition.
    pub fn contains(&self, ident: &str) -> bool {
        ident.starts_with(&self.0)
    }
}

impl fmt::Display for PartitionPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filename part of an identifier.
pub fn bare(ident: &str) -> &str {
    ident.rsplit('/').next().unwrap_or(ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix() -> PartitionPrefix {
        PartitionPrefix::new("data/logos/X")
    }

    #[test]
    fn test_new_normalizes_trailing_slash() {
        assert_eq!(PartitionPrefix::new("a/b").as_str(), "a/b/");
        assert_eq!(PartitionPrefix::new("a/b//").as_str(), "a/b/");
        assert_eq!(PartitionPrefix::join("a/b/", "/c/").as_str(), "a/b/c/");
        assert_eq!(PartitionPrefix::join("", "c").as_str(), "c/");
    }

    #[test]
    fn test_qualify_bare_name() {
        assert_eq!(prefix().qualify("logoA.png"), "data/logos/X/logoA.png");
    }

    #[test]
    fn test_qualify_keeps_qualified() {
        assert_eq!(
            prefix().qualify("data/logos/X/logoA.png"),
            "data/logos/X/logoA.png"
        );
    }

    #[test]
    fn test_qualify_reroots_foreign_path() {
        assert_eq!(
            prefix().qualify("somewhere/else/logoA.png"),
            "data/logos/X/logoA.png"
        );
    }

    #[test]
    fn test_qualify_is_idempotent() {
        let p = prefix();
        for ident in ["a.png", "x/y/a.png", "data/logos/X/a.png", "", "data/logos/Y/b.png"] {
            let once = p.qualify(ident);
            assert_eq!(p.qualify(&once), once, "not idempotent for {ident:?}");
        }
    }

    #[test]
    fn test_bare_inverts_qualify() {
        let p = prefix();
        for ident in ["a.png", "x/y/a.png", "data/logos/X/a.png"] {
            assert_eq!(p.bare(&p.qualify(ident)), "a.png");
        }
    }

    #[test]
    fn test_contains() {
        let p = prefix();
        assert!(p.contains("data/logos/X/a.png"));
        assert!(!p.contains("data/logos/Y/a.png"));
        assert!(!p.contains("a.png"));
    }
}
