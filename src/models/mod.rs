//! Core data models for district resolution.

pub mod district;

pub use district::{Boundary, Coordinate, DistrictPolygon, PostalCodeEntry};
