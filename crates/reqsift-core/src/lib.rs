//! Manifest inspection pipeline for reqsift.
//!
//! This crate ties the schema layer together: it reads a requirements listing
//! once, splits off its global directives, parses the remaining requirement
//! lines, and normalizes each one into a `DependencyRecord`. It also owns the
//! on-disk `InspectorConfig`.

pub mod config;
pub mod inspector;

pub use config::InspectorConfig;
pub use inspector::{
    get_dependencies_from_requirements, get_dependency, get_extra_data_from_requirements,
    Inspector, ManifestDependencies, SkippedRequirement,
};

use reqsift_schema::{InvalidSpecifierError, ManifestError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("invalid specifier on line {line} of {}: {source}", path.display())]
    InvalidSpecifier {
        path: PathBuf,
        line: usize,
        #[source]
        source: InvalidSpecifierError,
    },
    #[error("config error: {0}")]
    Config(String),
}
