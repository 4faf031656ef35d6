use super::{format_directives, json_pretty, EXIT_SUCCESS};
use reqsift_core::Inspector;
use std::path::Path;

pub fn run(inspector: &Inspector, manifest: &Path, json: bool) -> Result<u8, String> {
    let (directives, reduced) = inspector
        .split_manifest(manifest)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "manifest": manifest,
            "directives": directives,
            "reduced_manifest": reduced,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    if directives.is_empty() {
        println!("no directives");
    } else {
        for line in format_directives(&directives) {
            println!("{line}");
        }
    }
    println!("--- requirement lines (from line {}) ---", reduced.start + 1);
    print!("{}", reduced.to_text());
    Ok(EXIT_SUCCESS)
}
