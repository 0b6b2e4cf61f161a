use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pip::DistrictTable;
use crate::seed::SeedTable;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub table: TableConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

/// Where the district table comes from
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TableConfig {
    /// Seed JSON file; the embedded dataset is used when absent
    pub path: Option<PathBuf>,
    /// Reject duplicate postal codes, dangling references and degenerate rings
    pub strict: bool,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl TableConfig {
    pub fn load(&self) -> Result<DistrictTable> {
        let seed = match &self.path {
            Some(path) => SeedTable::load_from_file(path)
                .with_context(|| format!("Failed to load seed table {}", path.display()))?,
            None => SeedTable::embedded().context("Embedded seed table is invalid")?,
        };
        let table = seed
            .build(self.strict)
            .context("Failed to build district table")?;
        Ok(table)
    }
}
