// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers
//!
//! Meridian IDs are short, human-legible, and monotonic within their scope:
//! spaces are `s<N>`, runs are `r<N>` (per space), chats are `c<N>` (per
//! space). Harness and model IDs are free-form strings.

/// Define a newtype ID with a one-letter prefix and a numeric suffix.
///
/// Generates `from_number()`, `from_string()`, `as_str()`, `number()`,
/// `sort_key()`, `Display`, `From<&str>`/`From<String>`, `AsRef<str>`,
/// `Borrow<str>`, and `PartialEq<str>` implementations.
///
/// The ID format is `{prefix}{n}` where `n` is a sequence number allocated
/// by the storage layer. `from_string` accepts any string so malformed IDs
/// found in logs still round-trip; `number()` returns `None` for them and
/// `sort_key()` orders them after all well-formed IDs.
#[macro_export]
macro_rules! define_seq_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Build the ID for one sequence number.
            pub fn from_number(n: u64) -> Self {
                Self(format!("{}{}", Self::PREFIX, n))
            }

            /// Wrap an existing string (for parsing/deserialization).
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Numeric suffix when the ID is well-formed (`{prefix}{digits}`).
            pub fn number(&self) -> Option<u64> {
                let suffix = self.0.strip_prefix(Self::PREFIX)?;
                if suffix.is_empty() {
                    return None;
                }
                suffix.parse().ok()
            }

            /// Sort key: numeric order for well-formed IDs, everything else last.
            pub fn sort_key(&self) -> (u64, &str) {
                match self.number() {
                    Some(n) => (n, self.as_str()),
                    None => (u64::MAX, self.as_str()),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

/// Define a free-form string ID newtype.
#[macro_export]
macro_rules! define_str_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_seq_id! {
    /// Space identifier (`s<N>`), allocated under `.spaces/.lock`.
    pub struct SpaceId("s");
}

define_seq_id! {
    /// Run identifier (`r<N>`), scoped to a space.
    pub struct RunId("r");
}

define_seq_id! {
    /// Chat/session identifier (`c<N>`), scoped to a space.
    pub struct ChatId("c");
}

define_str_id! {
    /// Harness identifier (e.g. "claude", "codex", "opencode").
    pub struct HarnessId;
}

define_str_id! {
    /// Model identifier as given to the harness.
    pub struct ModelId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
