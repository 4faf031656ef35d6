use super::{json_pretty, EXIT_SUCCESS};
use reqsift_core::Inspector;
use std::path::Path;

/// Prints one JSON object per requirement, or a single array with `--json`.
pub fn run(inspector: &Inspector, manifest: &Path, json: bool) -> Result<u8, String> {
    let extra = inspector
        .extra_data(manifest)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&extra)?);
    } else {
        for entry in &extra {
            let line = serde_json::to_string(entry)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            println!("{line}");
        }
    }
    Ok(EXIT_SUCCESS)
}
