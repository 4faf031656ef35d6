//! Newtype wrappers for the string values that flow through a requirement.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
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

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Distribution name as written in a requirement, before purl normalization.
    PackageName
);

string_newtype!(
    /// Version text attached to a constraint, kept exactly as written.
    Version
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_display_and_as_ref() {
        let name = PackageName::new("requests");
        assert_eq!(name.to_string(), "requests");
        assert_eq!(name.as_str(), "requests");
        assert_eq!(AsRef::<str>::as_ref(&name), "requests");
    }

    #[test]
    fn version_serializes_as_plain_string() {
        let version = Version::new("1.2.3");
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);
    }

    #[test]
    fn compares_against_str() {
        let name = PackageName::from("flask");
        assert_eq!(name, "flask");
        assert!(!name.is_empty());
    }
}
