use super::{format_directives, json_pretty, yes_no, EXIT_SUCCESS};
use reqsift_core::Inspector;
use std::path::Path;

pub fn run(inspector: &Inspector, manifest: &Path, json: bool) -> Result<u8, String> {
    let result = inspector
        .dependencies(manifest)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&result)?);
        return Ok(EXIT_SUCCESS);
    }

    if !result.directives.is_empty() {
        println!("directives:");
        for line in format_directives(&result.directives) {
            println!("  {line}");
        }
    }

    if result.dependencies.is_empty() {
        println!("no dependencies found in {}", manifest.display());
    } else {
        println!("{:<40} {:<9} REQUIREMENT", "PURL", "RESOLVED");
        for dep in &result.dependencies {
            println!(
                "{:<40} {:<9} {}",
                dep.purl.to_string(),
                yes_no(dep.is_resolved),
                dep.extracted_requirement
            );
        }
    }

    for skipped in &result.skipped {
        println!(
            "skipped line {}: {} ({})",
            skipped.line_number, skipped.specifier, skipped.reason
        );
    }
    Ok(EXIT_SUCCESS)
}
