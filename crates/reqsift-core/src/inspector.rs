use crate::config::InspectorConfig;
use crate::CoreError;
use reqsift_schema::{
    normalize_specifier, normalize_specifier_with, split_directives, DependencyRecord,
    DirectiveTable, ExtraData, InvalidSpecifierError, ManifestParser, Pep508Parser,
    ReducedManifest, RequirementsParser, SpecifierParser,
};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// A requirement line that could not be turned into a dependency record.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedRequirement {
    pub line_number: usize,
    pub specifier: String,
    pub reason: String,
}

/// Everything extracted from one manifest.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ManifestDependencies {
    pub directives: DirectiveTable,
    pub dependencies: Vec<DependencyRecord>,
    pub skipped: Vec<SkippedRequirement>,
}

impl ManifestDependencies {
    /// Each dependency alongside the manifest-wide directives.
    pub fn pairs(&self) -> impl Iterator<Item = (&DependencyRecord, &DirectiveTable)> {
        self.dependencies.iter().map(|dep| (dep, &self.directives))
    }
}

/// Reads requirements listings and turns them into dependency records.
#[derive(Debug, Clone)]
pub struct Inspector<M = RequirementsParser, S = Pep508Parser> {
    config: InspectorConfig,
    manifest_parser: M,
    specifier_parser: S,
}

impl Inspector {
    pub fn new(config: InspectorConfig) -> Self {
        let manifest_parser = config.requirements_parser();
        Self {
            config,
            manifest_parser,
            specifier_parser: Pep508Parser,
        }
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new(InspectorConfig::default())
    }
}

impl<M: ManifestParser, S: SpecifierParser> Inspector<M, S> {
    pub fn with_parsers(config: InspectorConfig, manifest_parser: M, specifier_parser: S) -> Self {
        Self {
            config,
            manifest_parser,
            specifier_parser,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Read the manifest in a single scoped read.
    pub fn read_manifest(&self, path: &Path) -> Result<Vec<String>, CoreError> {
        let content = fs::read_to_string(path).map_err(|source| CoreError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(content.lines().map(str::to_owned).collect())
    }

    pub fn split_manifest(
        &self,
        path: &Path,
    ) -> Result<(DirectiveTable, ReducedManifest), CoreError> {
        let lines = self.read_manifest(path)?;
        let (directives, reduced) = split_directives(&lines);
        debug!(
            "{}: {} directive line(s), {} requirement line(s)",
            path.display(),
            reduced.start,
            reduced.len()
        );
        Ok((directives, reduced))
    }

    /// Normalize every requirement of the manifest at `path`.
    pub fn dependencies(&self, path: &Path) -> Result<ManifestDependencies, CoreError> {
        info!("inspecting requirements from {}", path.display());
        let (directives, reduced) = self.split_manifest(path)?;
        let entries = self
            .manifest_parser
            .parse_lines(reduced.lines(), path, reduced.start + 1)?;

        let mut dependencies = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();
        for entry in entries {
            if entry.is_constraint() {
                debug!(
                    "line {}: constraint '{}' is not a dependency",
                    entry.line_number, entry.specifier
                );
                continue;
            }
            match self.normalize(&entry.specifier) {
                Ok(record) => dependencies.push(record),
                Err(e) if self.config.skip_invalid => {
                    warn!(
                        "skipping line {} of {}: {e}",
                        entry.line_number,
                        path.display()
                    );
                    skipped.push(SkippedRequirement {
                        line_number: entry.line_number,
                        specifier: entry.specifier,
                        reason: e.to_string(),
                    });
                }
                Err(source) => {
                    return Err(CoreError::InvalidSpecifier {
                        path: path.to_path_buf(),
                        line: entry.line_number,
                        source,
                    });
                }
            }
        }

        info!(
            "{}: {} dependencies, {} skipped",
            path.display(),
            dependencies.len(),
            skipped.len()
        );
        Ok(ManifestDependencies {
            directives,
            dependencies,
            skipped,
        })
    }

    /// Per-line extra data for the whole manifest, directive lines included.
    pub fn extra_data(&self, path: &Path) -> Result<Vec<ExtraData>, CoreError> {
        let lines = self.read_manifest(path)?;
        let entries = self.manifest_parser.parse_lines(&lines, path, 1)?;
        Ok(entries.into_iter().map(|entry| entry.extra_data).collect())
    }

    pub fn normalize(&self, specifier: &str) -> Result<DependencyRecord, InvalidSpecifierError> {
        normalize_specifier_with(&self.specifier_parser, specifier)
    }
}

/// Dependencies of a requirements file, using the user's default config.
pub fn get_dependencies_from_requirements(
    path: impl AsRef<Path>,
) -> Result<ManifestDependencies, CoreError> {
    Inspector::new(InspectorConfig::load_default()?).dependencies(path.as_ref())
}

/// Extra data of a requirements file, using the user's default config.
pub fn get_extra_data_from_requirements(
    path: impl AsRef<Path>,
) -> Result<Vec<ExtraData>, CoreError> {
    Inspector::new(InspectorConfig::load_default()?).extra_data(path.as_ref())
}

/// Normalize one requirement specifier.
pub fn get_dependency(specifier: &str) -> Result<DependencyRecord, InvalidSpecifierError> {
    normalize_specifier(specifier)
}
