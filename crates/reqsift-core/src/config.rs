use crate::CoreError;
use reqsift_schema::RequirementsParser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for [`Inspector`](crate::Inspector), stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InspectorConfig {
    /// Follow `-r`/`-c` includes found among the requirement lines.
    #[serde(default = "default_true")]
    pub include_nested: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Log and skip unparsable requirement lines instead of failing.
    #[serde(default = "default_true")]
    pub skip_invalid: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            include_nested: true,
            max_depth: default_max_depth(),
            skip_invalid: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    RequirementsParser::default().max_depth
}

impl InspectorConfig {
    /// Load config from `~/.config/reqsift/config.toml`, falling back to the
    /// defaults when the file does not exist.
    pub fn load_default() -> Result<Self, CoreError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("cannot serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, content)
            .map_err(|e| CoreError::Config(format!("cannot write {}: {e}", path.display())))
    }

    pub fn requirements_parser(&self) -> RequirementsParser {
        RequirementsParser {
            include_nested: self.include_nested,
            max_depth: self.max_depth,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/reqsift/config.toml"))
}
