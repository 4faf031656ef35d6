pub mod completions;
pub mod deps;
pub mod directives;
pub mod extra;
pub mod normalize;

use reqsift_core::{Inspector, InspectorConfig};
use reqsift_schema::DirectiveTable;
use std::path::Path;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_SPECIFIER_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn load_inspector(config_path: Option<&Path>) -> Result<Inspector, String> {
    let config = match config_path {
        Some(path) => InspectorConfig::load(path),
        None => InspectorConfig::load_default(),
    }
    .map_err(|e| e.to_string())?;
    Ok(Inspector::new(config))
}

/// Render a directive table as `name: arg arg` lines.
pub fn format_directives(table: &DirectiveTable) -> Vec<String> {
    table
        .iter()
        .map(|(flag, args)| format!("{}: {}", flag.unwrap_or("(none)"), args.join(" ")))
        .collect()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
