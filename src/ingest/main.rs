//! Seed table builder.
//!
//! Merges district polygons and postal code mappings into a seed JSON file,
//! validating the result by building the lookup table.

mod postal;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use districts::{DistrictPolygon, SeedTable};

use crate::postal::load_postal_codes;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Build a district seed table from polygons and postal codes")]
struct Args {
    /// JSON array of districts
    #[arg(short, long)]
    districts: Option<PathBuf>,

    /// CSV with postal_code,district_code columns
    #[arg(short, long)]
    postal_codes: Option<PathBuf>,

    /// Existing seed table to extend (entries keep their position)
    #[arg(long)]
    base: Option<PathBuf>,

    /// Start from the embedded seed table instead of an empty one
    #[arg(long, conflicts_with = "base")]
    embedded: bool,

    /// Fail on duplicate postal codes, dangling references and degenerate rings
    #[arg(long)]
    strict: bool,

    /// Output seed JSON
    #[arg(short, long)]
    output: PathBuf,
}

/// Merges the base seed with the districts and postal code inputs, then
/// builds the table once to validate the result.
fn build_seed(args: &Args) -> Result<SeedTable> {
    let mut seed = if let Some(base) = &args.base {
        SeedTable::load_from_file(base)
            .with_context(|| format!("Failed to load base seed {}", base.display()))?
    } else if args.embedded {
        SeedTable::embedded()?
    } else {
        SeedTable::default()
    };

    if let Some(path) = &args.districts {
        let content = fs::read_to_string(path).context("Failed to read districts file")?;
        let districts: Vec<DistrictPolygon> =
            serde_json::from_str(&content).context("Failed to parse districts file")?;
        info!("Loaded {} districts from {}", districts.len(), path.display());
        seed.districts.extend(districts);
    }

    if let Some(path) = &args.postal_codes {
        seed.postal_codes.extend(load_postal_codes(path)?);
    }

    if seed.districts.is_empty() {
        warn!("Seed table has no districts; every lookup will miss");
    }

    // Validate against a clone; the merged source rows are what gets written
    let table = seed
        .clone()
        .build(args.strict)
        .context("Seed table failed validation")?;

    info!(
        "Validated {} districts and {} distinct postal codes",
        table.len(),
        table.postal_len()
    );
    if table.postal_len() < seed.postal_codes.len() {
        warn!(
            "{} postal code rows were duplicates or referenced unknown districts",
            seed.postal_codes.len() - table.postal_len()
        );
    }

    Ok(seed)
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Districts Seed Builder");

    let seed = build_seed(&args)?;

    let json = seed.to_json_pretty()?;
    fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Wrote seed table to {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const DISTRICTS: &str = r#"[
        {
            "code": "T01",
            "name_local": "t1",
            "name_alt": "t1",
            "boundary": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]
        },
        {
            "code": "T02",
            "name_local": "t2",
            "name_alt": "t2",
            "boundary": [[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 1.0], [2.0, 0.0]]
        }
    ]"#;

    // One repeated postal code and one row naming a district that does not exist
    const POSTAL: &str = "postal_code,district_code\n\
                          10001,T01\n\
                          10002,T02\n\
                          10001,T02\n\
                          10003,T99\n";

    fn args(dir: &Path, strict: bool, embedded: bool) -> Args {
        let districts = dir.join("districts.json");
        let postal_codes = dir.join("postal.csv");
        fs::write(&districts, DISTRICTS).unwrap();
        fs::write(&postal_codes, POSTAL).unwrap();

        Args {
            districts: Some(districts),
            postal_codes: Some(postal_codes),
            base: None,
            embedded,
            strict,
            output: dir.join("seed.json"),
        }
    }

    #[test]
    fn test_lenient_keeps_source_rows() {
        let dir = tempfile::tempdir().unwrap();
        let seed = build_seed(&args(dir.path(), false, false)).unwrap();

        assert_eq!(seed.districts.len(), 2);
        assert_eq!(seed.postal_codes.len(), 4);

        let table = seed.build(false).unwrap();
        assert_eq!(table.postal_len(), 2);
        assert_eq!(table.by_postal_code("10001").unwrap().code, "T02");
        assert!(table.by_postal_code("10003").is_none());
    }

    #[test]
    fn test_strict_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_seed(&args(dir.path(), true, false)).unwrap_err();
        assert!(err.to_string().contains("failed validation"));
    }

    #[test]
    fn test_embedded_base_is_extended() {
        let dir = tempfile::tempdir().unwrap();
        let seed = build_seed(&args(dir.path(), false, true)).unwrap();

        assert_eq!(seed.districts.len(), 10);
        assert_eq!(seed.districts[0].code, "MK001");
        assert_eq!(seed.districts[9].code, "T02");
    }

    #[test]
    fn test_base_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.json");
        fs::write(&base, SeedTable::embedded().unwrap().to_json_pretty().unwrap()).unwrap();

        let mut args = args(dir.path(), false, false);
        args.base = Some(base);
        args.postal_codes = None;
        let seed = build_seed(&args).unwrap();

        assert_eq!(seed.districts.len(), 10);
        assert_eq!(seed.postal_codes.len(), 10);
    }

    #[test]
    fn test_missing_districts_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), false, false);
        args.districts = Some(dir.path().join("missing.json"));
        assert!(build_seed(&args).is_err());
    }
}
