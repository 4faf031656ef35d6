use super::{json_pretty, yes_no, EXIT_SUCCESS};
use reqsift_core::Inspector;

pub fn run(inspector: &Inspector, specifiers: &[String], json: bool) -> Result<u8, String> {
    let records = specifiers
        .iter()
        .map(|spec| {
            inspector
                .normalize(spec)
                .map_err(|e| format!("invalid specifier '{spec}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        println!("{}", json_pretty(&records)?);
    } else {
        for record in &records {
            println!("purl:          {}", record.purl);
            println!("resolved:      {}", yes_no(record.is_resolved));
            println!("scope:         {}", record.scope);
            println!("requirement:   {}", record.extracted_requirement);
        }
    }
    Ok(EXIT_SUCCESS)
}
