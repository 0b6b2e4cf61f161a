use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use districts::PostalCodeEntry;

/// Load postal code mappings from a CSV file with a
/// `postal_code,district_code` header
pub fn load_postal_codes(path: &Path) -> Result<Vec<PostalCodeEntry>> {
    info!("Loading postal codes from {}", path.display());

    let file = File::open(path).context("Failed to open postal code file")?;
    let entries = read_postal_codes(file)
        .with_context(|| format!("Failed to parse postal code file {}", path.display()))?;

    info!("Loaded {} postal code rows", entries.len());
    Ok(entries)
}

pub fn read_postal_codes<R: Read>(reader: R) -> Result<Vec<PostalCodeEntry>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line, record) in csv_reader.deserialize::<PostalCodeEntry>().enumerate() {
        // +2: header row and 1-based numbering
        let entry = record.with_context(|| format!("Invalid row at line {}", line + 2))?;
        entries.push(entry);
    }

    Ok(entries)
}
