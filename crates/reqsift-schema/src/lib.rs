//! Requirements listing schema for reqsift.
//!
//! This crate holds the pure, I/O-light layer: splitting a manifest into
//! global directives and requirement lines (`split_directives`), the requirement
//! specifier grammar (`Pep508Parser`), package URLs (`PackageUrl`), dependency
//! records and the specifier normalizer (`normalize_specifier`), and the
//! pip-style requirements file parser (`RequirementsParser`).

pub mod directive;
pub mod manifest;
pub mod normalize;
pub mod purl;
pub mod specifier;
pub mod types;

pub use directive::{
    canonical_flag, parse_directive_line, split_directives, split_directives_str, DirectiveTable,
    ReducedManifest, SHORT_FLAG_ALIASES,
};
pub use manifest::{
    read_lines, ExtraData, ManifestError, ManifestParser, RequirementEntry, RequirementsParser,
};
pub use normalize::{
    normalize_specifier, normalize_specifier_with, normalize_text, DependencyRecord,
    InvalidSpecifierError, INSTALL_SCOPE,
};
pub use purl::{PackageUrl, PurlError, PYPI};
pub use specifier::{
    Constraint, Operator, Pep508Parser, Requirement, SpecifierError, SpecifierParser,
};
pub use types::{PackageName, Version};
