//! Package URLs: the canonical identifier attached to every dependency record.
//!
//! Only the `pkg:<type>/<name>[@<version>]` subset is produced here; namespaces,
//! qualifiers and subpaths never occur for requirements listings.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Package type tag for the Python package index.
pub const PYPI: &str = "pypi";

const SCHEME: &str = "pkg:";

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurlError {
    #[error("package URL type must not be empty")]
    EmptyType,
    #[error("package URL name must not be empty")]
    EmptyName,
    #[error("not a package URL: '{0}'")]
    Malformed(String),
    #[error("package URL component is not valid UTF-8: '{0}'")]
    Encoding(String),
}

/// A `{type, name, version}` package reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageUrl {
    ty: String,
    name: String,
    version: Option<String>,
}

impl PackageUrl {
    /// Build a package URL, applying the name normalization rules of `ty`.
    pub fn new(ty: &str, name: &str, version: Option<&str>) -> Result<Self, PurlError> {
        let ty = ty.trim().to_ascii_lowercase();
        if ty.is_empty() {
            return Err(PurlError::EmptyType);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(PurlError::EmptyName);
        }
        let name = if ty == PYPI {
            name.to_lowercase().replace('_', "-")
        } else {
            name.to_owned()
        };
        Ok(Self {
            ty,
            name,
            version: version
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned),
        })
    }

    pub fn pypi(name: &str, version: Option<&str>) -> Result<Self, PurlError> {
        Self::new(PYPI, name, version)
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SCHEME}{}/{}",
            self.ty,
            utf8_percent_encode(&self.name, COMPONENT)
        )?;
        if let Some(version) = &self.version {
            write!(f, "@{}", utf8_percent_encode(version, COMPONENT))?;
        }
        Ok(())
    }
}

impl FromStr for PackageUrl {
    type Err = PurlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PurlError::Malformed(s.to_owned());
        let rest = s.strip_prefix(SCHEME).ok_or_else(malformed)?;
        let (ty, rest) = rest.split_once('/').ok_or_else(malformed)?;
        if rest.contains('/') || rest.contains('?') || rest.contains('#') {
            return Err(malformed());
        }
        let (name, version) = match rest.split_once('@') {
            Some((name, version)) => (name, Some(decode(version)?)),
            None => (rest, None),
        };
        Self::new(ty, &decode(name)?, version.as_deref())
    }
}

fn decode(component: &str) -> Result<String, PurlError> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| PurlError::Encoding(component.to_owned()))
}

impl Serialize for PackageUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
