use crate::purl::PackageUrl;
use crate::specifier::{Pep508Parser, Requirement, SpecifierError, SpecifierParser};
use crate::types::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every requirement-line dependency is an install-time dependency.
pub const INSTALL_SCOPE: &str = "install";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSpecifierError {
    #[error("specifier is required but empty")]
    Empty,
    #[error("cannot parse specifier '{specifier}': {source}")]
    Unparsable {
        specifier: String,
        #[source]
        source: SpecifierError,
    },
    #[error("specifier '{0}' has no package name")]
    MissingName(String),
}

/// One normalized dependency declaration.
///
/// `extracted_requirement` holds the specifier with all whitespace removed and
/// lower-cased; `is_resolved` is set only when that specifier pins exactly one
/// version with `==` or `===`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyRecord {
    pub purl: PackageUrl,
    pub scope: String,
    pub is_runtime: bool,
    pub is_optional: bool,
    pub is_resolved: bool,
    pub extracted_requirement: String,
}

impl DependencyRecord {
    /// Build a record from an already parsed requirement.
    ///
    /// A requirement without a name never yields an identifier; it is rejected
    /// instead.
    pub fn from_requirement(
        requirement: &Requirement,
        extracted_requirement: String,
    ) -> Result<Self, InvalidSpecifierError> {
        if requirement.name.trim().is_empty() {
            return Err(InvalidSpecifierError::MissingName(extracted_requirement));
        }
        let version = requirement.pinned_version();
        let purl = PackageUrl::pypi(&requirement.name, version.map(Version::as_str))
            .map_err(|_| InvalidSpecifierError::MissingName(extracted_requirement.clone()))?;

        Ok(Self {
            purl,
            scope: INSTALL_SCOPE.to_owned(),
            is_runtime: true,
            is_optional: false,
            is_resolved: version.is_some(),
            extracted_requirement,
        })
    }
}

/// Remove every whitespace character (inner ones too) and lower-case the rest.
pub fn normalize_text(specifier: &str) -> String {
    specifier
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalize a requirement specifier with the default grammar.
pub fn normalize_specifier(specifier: &str) -> Result<DependencyRecord, InvalidSpecifierError> {
    normalize_specifier_with(&Pep508Parser, specifier)
}

/// Normalize a requirement specifier with a caller-provided grammar.
pub fn normalize_specifier_with<P>(
    parser: &P,
    specifier: &str,
) -> Result<DependencyRecord, InvalidSpecifierError>
where
    P: SpecifierParser + ?Sized,
{
    let normalized = normalize_text(specifier);
    if normalized.is_empty() {
        return Err(InvalidSpecifierError::Empty);
    }

    let requirement =
        parser
            .parse(&normalized)
            .map_err(|source| InvalidSpecifierError::Unparsable {
                specifier: normalized.clone(),
                source,
            })?;

    DependencyRecord::from_requirement(&requirement, normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackageName;

    #[test]
    fn pinned_specifier_is_resolved() {
        let dep = normalize_specifier("foo==1.2.3").unwrap();
        assert_eq!(dep.purl.to_string(), "pkg:pypi/foo@1.2.3");
        assert!(dep.is_resolved);
        assert_eq!(dep.scope, "install");
        assert!(dep.is_runtime);
        assert!(!dep.is_optional);
        assert_eq!(dep.extracted_requirement, "foo==1.2.3");
    }

    #[test]
    fn triple_equals_is_resolved() {
        let dep = normalize_specifier("foo===2.0").unwrap();
        assert!(dep.is_resolved);
        assert_eq!(dep.purl.version(), Some("2.0"));
    }

    #[test]
    fn range_specifier_is_unresolved_and_versionless() {
        let dep = normalize_specifier("name>=1.0").unwrap();
        assert!(!dep.is_resolved);
        assert_eq!(dep.purl.to_string(), "pkg:pypi/name");
    }

    #[test]
    fn multiple_constraints_are_unresolved() {
        let dep = normalize_specifier("name>=1.0,<2.0").unwrap();
        assert!(!dep.is_resolved);
        assert_eq!(dep.purl.version(), None);
    }

    #[test]
    fn bare_name_is_unresolved() {
        let dep = normalize_specifier("requests").unwrap();
        assert!(!dep.is_resolved);
        assert_eq!(dep.purl.to_string(), "pkg:pypi/requests");
    }

    #[test]
    fn strips_inner_whitespace_and_lowercases() {
        let dep = normalize_specifier("  Django >= 4.2 , < 5.0 ").unwrap();
        assert_eq!(dep.extracted_requirement, "django>=4.2,<5.0");
        assert_eq!(dep.purl.name(), "django");
    }

    #[test]
    fn normalization_is_idempotent() {
        for s in ["Foo == 1.0", "  bar[Extra] >=2 ", "Baz_Qux===1.0.0b1", "x"] {
            let once = normalize_specifier(s).unwrap();
            let twice = normalize_specifier(&normalize_text(s)).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn empty_and_blank_specifiers_fail() {
        assert_eq!(normalize_specifier(""), Err(InvalidSpecifierError::Empty));
        assert_eq!(normalize_specifier("   "), Err(InvalidSpecifierError::Empty));
        assert_eq!(
            normalize_specifier("\t\n"),
            Err(InvalidSpecifierError::Empty)
        );
    }

    #[test]
    fn unparsable_specifier_fails() {
        let err = normalize_specifier("foo=1.0").unwrap_err();
        assert!(matches!(err, InvalidSpecifierError::Unparsable { .. }));
        assert!(err.to_string().contains("foo=1.0"));
    }

    struct NamelessParser;

    impl SpecifierParser for NamelessParser {
        fn parse(&self, _specifier: &str) -> Result<Requirement, SpecifierError> {
            Ok(Requirement {
                name: PackageName::new(""),
                extras: Vec::new(),
                constraints: Vec::new(),
                url: None,
                marker: None,
            })
        }
    }

    #[test]
    fn nameless_requirement_is_rejected() {
        let err = normalize_specifier_with(&NamelessParser, "whatever").unwrap_err();
        assert_eq!(err, InvalidSpecifierError::MissingName("whatever".to_owned()));
    }

    #[test]
    fn local_version_is_percent_encoded() {
        let dep = normalize_specifier("Foo_Bar==1.0+local").unwrap();
        assert_eq!(dep.purl.to_string(), "pkg:pypi/foo-bar@1.0%2Blocal");
    }

    #[test]
    fn record_serializes_with_string_purl() {
        let dep = normalize_specifier("foo==1.0").unwrap();
        let json = serde_json::to_value(&dep).unwrap();
        assert_eq!(json["purl"], "pkg:pypi/foo@1.0");
        assert_eq!(json["is_resolved"], true);
        assert_eq!(json["scope"], "install");
    }
}
