use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Print lookup records to stdout as one JSON array.
pub fn records(records: &[Value], compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(records)?
    } else {
        serde_json::to_string_pretty(records)?
    };
    println!("{rendered}");
    Ok(())
}
