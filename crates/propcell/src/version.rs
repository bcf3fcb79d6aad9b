#![forbid(unsafe_code)]

//! Immutable snapshots of a cell's prior states.

use std::fmt;

/// One prior state of a [`Prop`](crate::Prop), captured just before a
/// mutation displaced it.
///
/// Versions are produced only by the cell itself, and only when a mutation
/// overwrites an already-set value; the very first mutation has nothing to
/// snapshot. The value may be absent when the displaced state was an
/// explicitly assigned "no value".
#[derive(Debug, Clone, PartialEq)]
pub struct Version<T> {
    value: Option<T>,
    timestamp: i64,
    author: Option<String>,
}

impl<T> Version<T> {
    pub(crate) fn new(value: Option<T>, timestamp: i64, author: Option<String>) -> Self {
        Self {
            value,
            timestamp,
            author,
        }
    }

    /// The value that was displaced.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Epoch-millisecond timestamp recorded when this value was stored,
    /// or the unset sentinel if the value was seeded without one.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Identifier of whoever stored this value, if one was recorded.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

impl<T: fmt::Display> fmt::Display for Version<T> {
    /// Renders `[value] modified on <timestamp> by <author>`, omitting the
    /// timestamp clause for sentinel (negative) stamps and the author clause
    /// when no non-blank author was recorded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "[{value}]")?,
            None => f.write_str("[]")?,
        }
        if self.timestamp >= 0 {
            write!(f, " modified on {}", self.timestamp)?;
        }
        if let Some(author) = &self.author
            && !author.trim().is_empty()
        {
            write!(f, " by {author}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let v = Version::new(Some("draft"), 1_500, Some("alice".to_string()));
        assert_eq!(v.value(), Some(&"draft"));
        assert_eq!(v.timestamp(), 1_500);
        assert_eq!(v.author(), Some("alice"));
    }

    #[test]
    fn display_full() {
        let v = Version::new(Some("draft"), 1_500, Some("alice".to_string()));
        assert_eq!(v.to_string(), "[draft] modified on 1500 by alice");
    }

    #[test]
    fn display_omits_sentinel_timestamp() {
        let v: Version<&str> = Version::new(Some("draft"), -1, Some("alice".to_string()));
        assert_eq!(v.to_string(), "[draft] by alice");
    }

    #[test]
    fn display_omits_blank_author() {
        let v = Version::new(Some("draft"), 1_500, Some("   ".to_string()));
        assert_eq!(v.to_string(), "[draft] modified on 1500");

        let v: Version<&str> = Version::new(Some("draft"), 1_500, None);
        assert_eq!(v.to_string(), "[draft] modified on 1500");
    }

    #[test]
    fn display_absent_value() {
        let v: Version<&str> = Version::new(None, 1_500, None);
        assert_eq!(v.to_string(), "[] modified on 1500");
    }
}
