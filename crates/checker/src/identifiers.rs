//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally interchanging —
//! for example — a [`ChangeId`] with a [`PatchSetId`] even though both are
//! `u64` under the hood.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (server-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — server-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a change under review by its server-assigned number.
    ChangeId
}

u64_id! {
    /// Identifies one patch set (revision) of a change.
    PatchSetId
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// The name of a repository hosted on the review server.
    RepositoryName
}

// ---------------------------------------------------------------------------
// Checker UUID
// ---------------------------------------------------------------------------

/// Identifies a registered checker: a (scheme, language, repository) triple.
///
/// The wire encoding is `"<scheme>:<language>-<hash>"` where `<hash>` is the
/// lowercase hex SHA-1 of the repository name. The encoding is stable across
/// runs so re-registering a checker for the same repository updates the
/// existing one instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckerUuid(String);

impl CheckerUuid {
    /// Derives the checker UUID for a language on a repository.
    pub fn encode(scheme: &str, language: &str, repository: &RepositoryName) -> Self {
        let digest = Sha1::digest(repository.as_str().as_bytes());
        Self(format!("{}:{}-{}", scheme, language, hex::encode(digest)))
    }

    /// Wraps a UUID received from the server, returning `None` if empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() { None } else { Some(Self(v)) }
    }

    /// Extracts the language this checker applies to.
    ///
    /// Strips the scheme prefix if present, then splits the remainder on `-`;
    /// the UUID must contain exactly two fields, the first of which is the
    /// language. UUIDs that do not follow this shape (including the
    /// `commitfooter-<key>` family, whose language itself contains `-`)
    /// return `None`.
    pub fn language(&self, scheme: &str) -> Option<&str> {
        let rest = self
            .0
            .strip_prefix(&format!("{}:", scheme))
            .unwrap_or(&self.0);
        let fields: Vec<&str> = rest.split('-').collect();
        if fields.len() != 2 {
            return None;
        }
        Some(fields[0])
    }

    /// Returns the UUID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckerUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryName {
        RepositoryName::new("gerrit-linter-test").unwrap()
    }

    #[test]
    fn encode_shape() {
        let uuid = CheckerUuid::encode("fmt", "go", &repo());
        let s = uuid.as_str();
        assert!(s.starts_with("fmt:go-"));
        let hash = &s["fmt:go-".len()..];
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn decode_extracts_language() {
        let uuid = CheckerUuid::encode("fmt", "commitmsg", &repo());
        assert_eq!(uuid.language("fmt"), Some("commitmsg"));
    }

    #[test]
    fn decode_then_encode_is_identity() {
        let original = CheckerUuid::encode("fmt", "bzl", &repo());
        let language = original.language("fmt").unwrap();
        let round_tripped = CheckerUuid::encode("fmt", language, &repo());
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn commit_footer_family_does_not_decode() {
        // The family language contains '-', so the two-field split rejects
        // it. Kept intentionally in sync with the registration encoding.
        let uuid = CheckerUuid::encode("fmt", "commitfooter-Change-Id", &repo());
        assert_eq!(uuid.language("fmt"), None);
    }

    #[test]
    fn garbage_does_not_decode() {
        let uuid = CheckerUuid::new("fmt:nodigest").unwrap();
        assert_eq!(uuid.language("fmt"), None);
    }
}
