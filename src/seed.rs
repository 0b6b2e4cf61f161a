//! Seed table wire format and the embedded default dataset.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TableError};
use crate::models::{DistrictPolygon, PostalCodeEntry};
use crate::pip::DistrictTable;

/// Makkah districts shipped with the crate
const EMBEDDED_SEED: &str = include_str!("../data/makkah.json");

/// Districts and postal codes in definition order, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedTable {
    pub districts: Vec<DistrictPolygon>,
    #[serde(default)]
    pub postal_codes: Vec<PostalCodeEntry>,
}

impl SeedTable {
    /// Parse the dataset compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_SEED)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading seed table from {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the immutable lookup table
    pub fn build(self, strict: bool) -> Result<DistrictTable> {
        DistrictTable::builder()
            .strict(strict)
            .districts(self.districts)
            .postal_codes(self.postal_codes)
            .build()
    }
}
