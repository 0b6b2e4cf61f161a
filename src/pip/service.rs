//! District resolution by postal code or coordinate.

use std::borrow::Cow;
use std::sync::Arc;

use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::{planar_distance, square_around, vertex_mean};
use super::table::DistrictTable;
use crate::models::{Boundary, Coordinate, DistrictPolygon};

/// Code carried by every generated district
pub const GENERATED_CODE: &str = "GEN001";

/// Half-width of a generated district in degrees (roughly 1 km at
/// mid-latitudes; not geodesically exact)
pub const GENERATED_HALF_WIDTH: f64 = 0.01;

/// Characters compared by the loose postal-code fallback
const POSTAL_PREFIX_CHARS: usize = 3;

/// How a coordinate lookup found its district
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// A ring of the district contains the point
    Contained,
    /// No ring contains the point; this district has the closest centroid
    Nearest { distance: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution<'a> {
    pub district: &'a DistrictPolygon,
    #[serde(rename = "match")]
    pub kind: MatchKind,
}

/// Which step of [`DistrictResolver::resolve`] produced the district
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    PostalCode,
    Contained,
    Nearest,
    Generated,
}

/// Raw location input as a form would supply it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationQuery {
    pub postal_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolved<'a> {
    pub district: Cow<'a, DistrictPolygon>,
    pub source: ResolutionSource,
}

/// Zero (either sign) and NaN count as "not provided"
fn is_absent(value: f64) -> bool {
    value == 0.0 || value.is_nan()
}

/// Build a placeholder district: a closed square around `(lng, lat)`.
///
/// Never fails. Both labels embed the coordinates rounded to 4 decimals.
pub fn generate_district_around_coordinates(lat: f64, lng: f64) -> DistrictPolygon {
    let ring = square_around(Coord { x: lng, y: lat }, GENERATED_HALF_WIDTH);

    DistrictPolygon::new(
        GENERATED_CODE,
        &format!("حي ({:.4}, {:.4})", lat, lng),
        &format!("District ({:.4}, {:.4})", lat, lng),
        Boundary::Ring(ring),
    )
}

/// Pure lookups over a shared, immutable [`DistrictTable`]
#[derive(Debug, Clone)]
pub struct DistrictResolver {
    table: Arc<DistrictTable>,
}

impl DistrictResolver {
    pub fn new(table: Arc<DistrictTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &DistrictTable {
        &self.table
    }

    /// Exact postal code match, then the first entry sharing the first
    /// three characters (table-definition order).
    pub fn find_district_by_postal_code(&self, postal_code: &str) -> Option<&DistrictPolygon> {
        if let Some(district) = self.table.by_postal_code(postal_code) {
            debug!("Postal code {} -> {}", postal_code, district.code);
            return Some(district);
        }

        if postal_code.chars().count() < POSTAL_PREFIX_CHARS {
            return None;
        }

        let end = postal_code
            .char_indices()
            .nth(POSTAL_PREFIX_CHARS)
            .map_or(postal_code.len(), |(i, _)| i);
        let prefix = &postal_code[..end];

        let (entry, district) = self.table.first_with_prefix(prefix)?;
        debug!(
            "Postal code {} matched by prefix {} via {} -> {}",
            postal_code, prefix, entry.postal_code, district.code
        );
        Some(district)
    }

    /// Coordinate lookup that treats `0` (or NaN) in either component as
    /// "no location given".
    pub fn find_district_by_coordinates(&self, lat: f64, lng: f64) -> Option<&DistrictPolygon> {
        self.locate_coordinates(lat, lng).map(|res| res.district)
    }

    /// [`Self::locate`] with the same "zero means missing" rule as
    /// [`Self::find_district_by_coordinates`]
    pub fn locate_coordinates(&self, lat: f64, lng: f64) -> Option<Resolution<'_>> {
        if is_absent(lat) || is_absent(lng) {
            debug!("Coordinate ({}, {}) treated as missing", lat, lng);
            return None;
        }
        self.locate(Coordinate::new(lng, lat))
    }

    /// Containing district, else the district with the nearest centroid.
    /// `None` only for an empty table or a non-finite point.
    pub fn find_district_by_point(&self, point: Coordinate) -> Option<&DistrictPolygon> {
        self.locate(point).map(|res| res.district)
    }

    pub fn locate(&self, point: Coordinate) -> Option<Resolution<'_>> {
        if !point.lng.is_finite() || !point.lat.is_finite() {
            return None;
        }

        let coord: Coord<f64> = point.into();

        if let Some(district) = self.table.containing(coord) {
            debug!("({}, {}) inside {}", point.lat, point.lng, district.code);
            return Some(Resolution {
                district,
                kind: MatchKind::Contained,
            });
        }

        let (district, distance) = self.nearest(coord)?;
        debug!(
            "({}, {}) outside all districts; nearest centroid is {} at {:.5}",
            point.lat, point.lng, district.code, distance
        );
        Some(Resolution {
            district,
            kind: MatchKind::Nearest { distance },
        })
    }

    /// Planar distance to each district's first-ring vertex mean; ties go
    /// to the earlier district.
    fn nearest(&self, coord: Coord<f64>) -> Option<(&DistrictPolygon, f64)> {
        let mut best: Option<(&DistrictPolygon, f64)> = None;

        for district in self.table.districts() {
            let Some(centroid) = district.boundary.first_ring().and_then(vertex_mean) else {
                continue;
            };
            let distance = planar_distance(coord, centroid);
            if !distance.is_finite() {
                continue;
            }
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((district, distance));
            }
        }

        best
    }

    pub fn generate_district_around_coordinates(&self, lat: f64, lng: f64) -> DistrictPolygon {
        generate_district_around_coordinates(lat, lng)
    }

    /// Postal code, then coordinate, then a generated placeholder.
    ///
    /// Returns `None` only when neither lookup has usable input.
    pub fn resolve(&self, query: &LocationQuery) -> Option<Resolved<'_>> {
        if let Some(postal_code) = query.postal_code.as_deref() {
            if let Some(district) = self.find_district_by_postal_code(postal_code) {
                return Some(Resolved {
                    district: Cow::Borrowed(district),
                    source: ResolutionSource::PostalCode,
                });
            }
        }

        let (lat, lng) = match (query.lat, query.lng) {
            (Some(lat), Some(lng)) if !is_absent(lat) && !is_absent(lng) => (lat, lng),
            _ => return None,
        };

        if let Some(res) = self.locate(Coordinate::new(lng, lat)) {
            let source = match res.kind {
                MatchKind::Contained => ResolutionSource::Contained,
                MatchKind::Nearest { .. } => ResolutionSource::Nearest,
            };
            return Some(Resolved {
                district: Cow::Borrowed(res.district),
                source,
            });
        }

        Some(Resolved {
            district: Cow::Owned(generate_district_around_coordinates(lat, lng)),
            source: ResolutionSource::Generated,
        })
    }
}
