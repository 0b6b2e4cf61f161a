//! Point-in-Polygon (PIP) district lookup.
//!
//! Holds the immutable district table with an R-tree of district envelopes
//! and resolves postal codes and coordinates to districts.

pub mod geometry;
mod service;
mod table;

pub use service::{
    generate_district_around_coordinates, DistrictResolver, LocationQuery, MatchKind,
    Resolution, ResolutionSource, Resolved, GENERATED_CODE, GENERATED_HALF_WIDTH,
};
pub use table::{DistrictTable, TableBuilder};
