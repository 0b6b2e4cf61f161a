//! District polygons and postal-code entries.

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// A (longitude, latitude) pair in decimal degrees, WGS84.
///
/// No range validation is performed anywhere in the crate: out-of-range
/// values simply never fall inside a district.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord { x: c.lng, y: c.lat }
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Self { lng: c.x, lat: c.y }
    }
}

/// District boundary: one ring, or several rings for multi-part districts.
///
/// Vertices are `x = longitude`, `y = latitude`. Rings are kept exactly as
/// loaded; the closing vertex may or may not be repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundaryRepr", into = "BoundaryRepr")]
pub enum Boundary {
    Ring(LineString<f64>),
    MultiRing(Vec<LineString<f64>>),
}

impl Boundary {
    /// All rings of the boundary, in stored order
    pub fn rings(&self) -> &[LineString<f64>] {
        match self {
            Boundary::Ring(ring) => std::slice::from_ref(ring),
            Boundary::MultiRing(rings) => rings,
        }
    }

    /// The ring used for centroid computation
    pub fn first_ring(&self) -> Option<&LineString<f64>> {
        self.rings().first()
    }
}

/// Wire form of [`Boundary`]: `[[lng, lat], ...]` or `[[[lng, lat], ...], ...]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum BoundaryRepr {
    Ring(Vec<[f64; 2]>),
    MultiRing(Vec<Vec<[f64; 2]>>),
}

fn ring_from_pairs(pairs: Vec<[f64; 2]>) -> LineString<f64> {
    pairs
        .into_iter()
        .map(|[x, y]| Coord { x, y })
        .collect::<Vec<_>>()
        .into()
}

fn ring_to_pairs(ring: LineString<f64>) -> Vec<[f64; 2]> {
    ring.0.into_iter().map(|c| [c.x, c.y]).collect()
}

impl From<BoundaryRepr> for Boundary {
    fn from(repr: BoundaryRepr) -> Self {
        match repr {
            BoundaryRepr::Ring(pairs) => Boundary::Ring(ring_from_pairs(pairs)),
            BoundaryRepr::MultiRing(rings) => {
                Boundary::MultiRing(rings.into_iter().map(ring_from_pairs).collect())
            }
        }
    }
}

impl From<Boundary> for BoundaryRepr {
    fn from(boundary: Boundary) -> Self {
        match boundary {
            Boundary::Ring(ring) => BoundaryRepr::Ring(ring_to_pairs(ring)),
            Boundary::MultiRing(rings) => {
                BoundaryRepr::MultiRing(rings.into_iter().map(ring_to_pairs).collect())
            }
        }
    }
}

/// A named administrative district of a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictPolygon {
    /// Stable identifier, e.g. "MK001" (region + sequence)
    pub code: String,

    /// Label in the local language
    pub name_local: String,

    /// Alternate (usually Latin-script) label
    pub name_alt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_code: Option<String>,

    pub boundary: Boundary,
}

impl DistrictPolygon {
    pub fn new(code: &str, name_local: &str, name_alt: &str, boundary: Boundary) -> Self {
        Self {
            code: code.to_string(),
            name_local: name_local.to_string(),
            name_alt: name_alt.to_string(),
            region_code: None,
            city_code: None,
            boundary,
        }
    }

    /// Set region and city grouping codes
    pub fn with_grouping(mut self, region_code: &str, city_code: &str) -> Self {
        self.region_code = Some(region_code.to_string());
        self.city_code = Some(city_code.to_string());
        self
    }
}

/// Maps one postal code to one district code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalCodeEntry {
    pub postal_code: String,
    pub district_code: String,
}

impl PostalCodeEntry {
    pub fn new(postal_code: &str, district_code: &str) -> Self {
        Self {
            postal_code: postal_code.to_string(),
            district_code: district_code.to_string(),
        }
    }
}
