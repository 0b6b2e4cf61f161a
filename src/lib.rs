//! Districts - resolve postal codes and coordinates to administrative districts
//!
//! This library provides the district table, the resolver, and shared types
//! for the query and ingest binaries.

pub mod config;
pub mod error;
pub mod models;
pub mod pip;
pub mod seed;

pub use error::TableError;
pub use models::{Boundary, Coordinate, DistrictPolygon, PostalCodeEntry};
pub use pip::{DistrictResolver, DistrictTable};
pub use seed::SeedTable;
