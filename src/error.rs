//! Errors raised while building or loading a district table.
//!
//! Lookups never fail; a miss is `None`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("duplicate district code {0}")]
    DuplicateDistrict(String),

    /// Only raised by strict builders; lenient builders keep the last value
    #[error("duplicate postal code {0}")]
    DuplicatePostalCode(String),

    #[error("postal code {postal_code} references unknown district {district_code}")]
    UnknownDistrict {
        postal_code: String,
        district_code: String,
    },

    #[error("district {code} has a ring with {vertices} distinct vertices (need at least 3)")]
    DegenerateRing { code: String, vertices: usize },

    #[error("district {code} has a vertex with a non-finite coordinate")]
    NonFiniteVertex { code: String },

    #[error("failed to read seed table {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed table")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T, E = TableError> = std::result::Result<T, E>;
