//! Deterministic key prefixing.
//!
//! A [`Namespace`] turns user keys into namespaced keys of the form
//! `<root><delim><root identifier><delim><key>`. The root identifier is a
//! reserved token; inputs containing it are rejected so the namespaced form
//! stays injective in `(root, key)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_DELIMITER: &str = ":";
const DEFAULT_ROOT_IDENTIFIER: &str = "_rt";

/// Error produced when a root or key contains the reserved token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{input}\" contains the reserved root identifier \"{token}\"")]
pub struct NamespaceError {
    /// The offending input.
    pub input: String,
    /// The reserved token.
    pub token: String,
}

/// A key prefix shared by every key a provider produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    root: String,
    delimiter: String,
    root_identifier: String,
}

impl Namespace {
    /// Creates a namespace with the default delimiter (`:`) and root
    /// identifier (`_rt`).
    pub fn new(root: impl Into<String>) -> Result<Self, NamespaceError> {
        Self::with_settings(root, DEFAULT_DELIMITER, DEFAULT_ROOT_IDENTIFIER)
    }

    /// Creates a namespace with an explicit delimiter and root identifier.
    pub fn with_settings(
        root: impl Into<String>,
        delimiter: impl Into<String>,
        root_identifier: impl Into<String>,
    ) -> Result<Self, NamespaceError> {
        let root = root.into();
        let root_identifier = root_identifier.into();
        if root.contains(root_identifier.as_str()) {
            return Err(NamespaceError {
                input: root,
                token: root_identifier,
            });
        }
        Ok(Self {
            root,
            delimiter: delimiter.into(),
            root_identifier,
        })
    }

    /// Returns the root path.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Creates a [`Key`] for a user-supplied key.
    ///
    /// Rejects keys containing the reserved root identifier token.
    pub fn create(&self, key: impl Into<String>) -> Result<Key, NamespaceError> {
        let original = key.into();
        if original.contains(self.root_identifier.as_str()) {
            return Err(NamespaceError {
                input: original,
                token: self.root_identifier.clone(),
            });
        }
        let namespaced = format!(
            "{root}{d}{ident}{d}{key}",
            root = self.root,
            d = self.delimiter,
            ident = self.root_identifier,
            key = original,
        );
        Ok(Key {
            original,
            namespaced,
        })
    }

    /// The prefix shared by every key of this namespace, including the
    /// trailing delimiter. Useful for prefix-based removal.
    pub fn prefix(&self) -> String {
        format!(
            "{root}{d}{ident}{d}",
            root = self.root,
            d = self.delimiter,
            ident = self.root_identifier,
        )
    }
}

/// A user key together with its namespaced storage form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    original: String,
    namespaced: String,
}

impl Key {
    /// The key as the user supplied it.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The key as stored by adapters.
    pub fn namespaced(&self) -> &str {
        &self.namespaced
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.namespaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_form_combines_root_identifier_and_key() {
        let ns = Namespace::new("cache/users").unwrap();
        let key = ns.create("alice").unwrap();
        assert_eq!(key.original(), "alice");
        assert_eq!(key.namespaced(), "cache/users:_rt:alice");
    }

    #[test]
    fn custom_delimiter_and_identifier() {
        let ns = Namespace::with_settings("locks", "/", "#root").unwrap();
        let key = ns.create("job-42").unwrap();
        assert_eq!(key.namespaced(), "locks/#root/job-42");
        assert_eq!(ns.prefix(), "locks/#root/");
    }

    #[test]
    fn key_containing_reserved_token_is_rejected() {
        let ns = Namespace::new("app").unwrap();
        let err = ns.create("evil_rt_key").unwrap_err();
        assert_eq!(err.token, "_rt");
        assert_eq!(err.input, "evil_rt_key");
    }

    #[test]
    fn root_containing_reserved_token_is_rejected() {
        let err = Namespace::new("bad_rt_root").unwrap_err();
        assert_eq!(err.token, "_rt");
    }

    #[test]
    fn distinct_pairs_produce_distinct_namespaced_keys() {
        let a = Namespace::new("a").unwrap().create("b:c").unwrap();
        let b = Namespace::new("a:b").unwrap().create("c").unwrap();
        // Root identifier placement keeps the forms apart even when the raw
        // concatenation would collide.
        assert_ne!(a.namespaced(), b.namespaced());
    }

    #[test]
    fn keys_serialize_round_trip() {
        let key = Namespace::new("app").unwrap().create("k").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
