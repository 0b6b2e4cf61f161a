//! Immutable district table with an R-tree of district envelopes.

use geo::Coord;
use hashbrown::HashMap;
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info, warn};

use super::geometry::{
    distinct_vertices, is_degenerate, is_finite_ring, ring_contains, rings_envelope,
};
use crate::error::{Result, TableError};
use crate::models::{DistrictPolygon, PostalCodeEntry};

/// Envelope of one district, pointing back at its definition index
#[derive(Debug, Clone)]
struct IndexedDistrict {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedDistrict {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedDistrict {
    fn new(index: usize, district: &DistrictPolygon) -> Option<Self> {
        let rect = rings_envelope(district.boundary.rings())?;
        Some(Self {
            index,
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }
}

#[derive(Debug, Clone)]
struct PostalSlot {
    entry: PostalCodeEntry,
    district: usize,
}

/// The seed table: districts and postal codes, in definition order.
///
/// Built once through [`TableBuilder`] and never mutated afterwards, so it
/// can be shared behind an `Arc` without locking.
#[derive(Debug)]
pub struct DistrictTable {
    districts: Vec<DistrictPolygon>,
    by_code: HashMap<String, usize>,
    postal_codes: Vec<PostalSlot>,
    postal_index: HashMap<String, usize>,
    tree: RTree<IndexedDistrict>,
}

impl DistrictTable {
    pub fn builder() -> TableBuilder {
        TableBuilder::new()
    }

    pub fn empty() -> Self {
        Self {
            districts: Vec::new(),
            by_code: HashMap::new(),
            postal_codes: Vec::new(),
            postal_index: HashMap::new(),
            tree: RTree::new(),
        }
    }

    /// Number of districts
    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Number of distinct postal codes
    pub fn postal_len(&self) -> usize {
        self.postal_codes.len()
    }

    /// Districts in definition order
    pub fn districts(&self) -> &[DistrictPolygon] {
        &self.districts
    }

    /// Postal code entries in definition order (first-insertion position)
    pub fn postal_codes(&self) -> impl Iterator<Item = &PostalCodeEntry> {
        self.postal_codes.iter().map(|slot| &slot.entry)
    }

    pub fn get(&self, code: &str) -> Option<&DistrictPolygon> {
        self.by_code.get(code).map(|&i| &self.districts[i])
    }

    /// Exact postal code lookup
    pub fn by_postal_code(&self, postal_code: &str) -> Option<&DistrictPolygon> {
        self.postal_index
            .get(postal_code)
            .map(|&slot| &self.districts[self.postal_codes[slot].district])
    }

    /// First postal entry (definition order) whose key starts with `prefix`
    pub fn first_with_prefix(&self, prefix: &str) -> Option<(&PostalCodeEntry, &DistrictPolygon)> {
        self.postal_codes
            .iter()
            .find(|slot| slot.entry.postal_code.starts_with(prefix))
            .map(|slot| (&slot.entry, &self.districts[slot.district]))
    }

    /// First district (definition order) with a ring containing `point`
    pub fn containing(&self, point: Coord<f64>) -> Option<&DistrictPolygon> {
        let query = AABB::from_point([point.x, point.y]);

        // The R-tree yields candidates in arbitrary order; keep the lowest index
        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|ind| {
                self.districts[ind.index]
                    .boundary
                    .rings()
                    .iter()
                    .any(|ring| ring_contains(ring, point))
            })
            .map(|ind| ind.index)
            .min()
            .map(|i| &self.districts[i])
    }
}

/// Builds a [`DistrictTable`].
///
/// Lenient by default: duplicate postal codes keep the last value (at the
/// position of the first), postal codes naming unknown districts are
/// dropped, degenerate rings are kept but never match, and districts with a
/// non-finite vertex are kept out of the R-tree. `strict(true)` turns each of
/// those into a [`TableError`]. Duplicate district codes are
/// always an error.
#[derive(Debug, Default)]
pub struct TableBuilder {
    strict: bool,
    districts: Vec<DistrictPolygon>,
    postal_codes: Vec<PostalCodeEntry>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn district(mut self, district: DistrictPolygon) -> Self {
        self.districts.push(district);
        self
    }

    pub fn districts<I: IntoIterator<Item = DistrictPolygon>>(mut self, districts: I) -> Self {
        self.districts.extend(districts);
        self
    }

    pub fn postal_code(mut self, postal_code: &str, district_code: &str) -> Self {
        self.postal_codes
            .push(PostalCodeEntry::new(postal_code, district_code));
        self
    }

    pub fn postal_codes<I: IntoIterator<Item = PostalCodeEntry>>(mut self, entries: I) -> Self {
        self.postal_codes.extend(entries);
        self
    }

    pub fn build(self) -> Result<DistrictTable> {
        info!(
            "Building district table from {} districts and {} postal codes (strict: {})...",
            self.districts.len(),
            self.postal_codes.len(),
            self.strict
        );

        let mut table = DistrictTable::empty();
        let mut indexed = Vec::with_capacity(self.districts.len());

        for district in self.districts {
            if table.by_code.contains_key(&district.code) {
                return Err(TableError::DuplicateDistrict(district.code));
            }

            let mut finite = true;
            for ring in district.boundary.rings() {
                if !is_finite_ring(ring) {
                    if self.strict {
                        return Err(TableError::NonFiniteVertex {
                            code: district.code.clone(),
                        });
                    }
                    finite = false;
                }

                if is_degenerate(ring) {
                    let vertices = distinct_vertices(ring, 3);
                    if self.strict {
                        return Err(TableError::DegenerateRing {
                            code: district.code.clone(),
                            vertices,
                        });
                    }
                    warn!(
                        "District {} has a ring with {} distinct vertices; it will never match",
                        district.code, vertices
                    );
                }
            }

            let index = table.districts.len();
            if !finite {
                // Non-finite envelopes break the R-tree; such districts never match
                warn!(
                    "District {} has a non-finite vertex; leaving it out of the index",
                    district.code
                );
            } else {
                match IndexedDistrict::new(index, &district) {
                    Some(ind) => indexed.push(ind),
                    None => warn!("District {} has an empty boundary", district.code),
                }
            }
            table.by_code.insert(district.code.clone(), index);
            table.districts.push(district);
        }

        for entry in self.postal_codes {
            let Some(&district) = table.by_code.get(&entry.district_code) else {
                if self.strict {
                    return Err(TableError::UnknownDistrict {
                        postal_code: entry.postal_code,
                        district_code: entry.district_code,
                    });
                }
                warn!(
                    "Dropping postal code {}: unknown district {}",
                    entry.postal_code, entry.district_code
                );
                continue;
            };

            match table.postal_index.get(&entry.postal_code) {
                Some(&slot) => {
                    if self.strict {
                        return Err(TableError::DuplicatePostalCode(entry.postal_code));
                    }
                    debug!(
                        "Postal code {} remapped from {} to {}",
                        entry.postal_code,
                        table.postal_codes[slot].entry.district_code,
                        entry.district_code
                    );
                    table.postal_codes[slot] = PostalSlot { entry, district };
                }
                None => {
                    table
                        .postal_index
                        .insert(entry.postal_code.clone(), table.postal_codes.len());
                    table.postal_codes.push(PostalSlot { entry, district });
                }
            }
        }

        table.tree = RTree::bulk_load(indexed);

        info!(
            "District table built with {} districts ({} indexed) and {} postal codes",
            table.districts.len(),
            table.tree.size(),
            table.postal_codes.len()
        );

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Boundary;
    use geo::LineString;

    fn square(code: &str, min_x: f64, min_y: f64, size: f64) -> DistrictPolygon {
        let ring = LineString::from(vec![
            (min_x, min_y),
            (min_x + size, min_y),
            (min_x + size, min_y + size),
            (min_x, min_y + size),
        ]);
        DistrictPolygon::new(code, code, code, Boundary::Ring(ring))
    }

    #[test]
    fn test_duplicate_postal_code_last_write_wins() {
        let table = DistrictTable::builder()
            .district(square("A", 0.0, 0.0, 1.0))
            .district(square("B", 2.0, 0.0, 1.0))
            .postal_code("11111", "A")
            .postal_code("22222", "B")
            .postal_code("11111", "B")
            .build()
            .unwrap();

        assert_eq!(table.postal_len(), 2);
        assert_eq!(table.by_postal_code("11111").unwrap().code, "B");

        // Overwritten key keeps its original position
        let order: Vec<&str> = table.postal_codes().map(|e| e.postal_code.as_str()).collect();
        assert_eq!(order, vec!["11111", "22222"]);
    }

    #[test]
    fn test_strict_rejects_duplicate_postal_code() {
        let err = DistrictTable::builder()
            .strict(true)
            .district(square("A", 0.0, 0.0, 1.0))
            .postal_code("11111", "A")
            .postal_code("11111", "A")
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicatePostalCode(code) if code == "11111"));
    }

    #[test]
    fn test_duplicate_district_code_is_always_an_error() {
        let err = DistrictTable::builder()
            .district(square("A", 0.0, 0.0, 1.0))
            .district(square("A", 5.0, 5.0, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicateDistrict(code) if code == "A"));
    }

    #[test]
    fn test_unknown_district_reference() {
        let table = DistrictTable::builder()
            .district(square("A", 0.0, 0.0, 1.0))
            .postal_code("11111", "Z")
            .build()
            .unwrap();
        assert_eq!(table.postal_len(), 0);
        assert!(table.by_postal_code("11111").is_none());

        let err = DistrictTable::builder()
            .strict(true)
            .district(square("A", 0.0, 0.0, 1.0))
            .postal_code("11111", "Z")
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::UnknownDistrict { .. }));
    }

    #[test]
    fn test_degenerate_ring_lenient_and_strict() {
        let line = DistrictPolygon::new(
            "L",
            "l",
            "l",
            Boundary::Ring(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])),
        );

        let table = DistrictTable::builder()
            .district(line.clone())
            .build()
            .unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.containing(Coord { x: 0.5, y: 0.5 }).is_none());

        let err = DistrictTable::builder()
            .strict(true)
            .district(line)
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::DegenerateRing { vertices: 2, .. }));
    }

    #[test]
    fn test_strict_counts_distinct_vertices() {
        let back_and_forth = DistrictPolygon::new(
            "BF",
            "bf",
            "bf",
            Boundary::Ring(LineString::from(vec![
                (0.0, 0.0),
                (1.0, 1.0),
                (0.0, 0.0),
                (1.0, 1.0),
            ])),
        );

        let err = DistrictTable::builder()
            .strict(true)
            .district(back_and_forth.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::DegenerateRing { vertices: 2, .. }));

        let table = DistrictTable::builder()
            .district(back_and_forth)
            .build()
            .unwrap();
        assert!(table.containing(Coord { x: 0.5, y: 0.5 }).is_none());
    }

    fn grid_with_nan_vertex() -> Vec<DistrictPolygon> {
        let mut districts: Vec<DistrictPolygon> = (0..20)
            .map(|i| square(&format!("D{:02}", i), i as f64 * 2.0, 0.0, 1.0))
            .collect();
        districts[7] = DistrictPolygon::new(
            "D07",
            "d",
            "d",
            Boundary::Ring(LineString::from(vec![
                (14.0, 0.0),
                (f64::NAN, 0.0),
                (15.0, 1.0),
                (14.0, 1.0),
            ])),
        );
        districts
    }

    #[test]
    fn test_non_finite_vertex_is_left_out_of_index() {
        let table = DistrictTable::builder()
            .districts(grid_with_nan_vertex())
            .postal_code("70000", "D07")
            .build()
            .unwrap();

        assert_eq!(table.len(), 20);
        assert_eq!(table.by_postal_code("70000").unwrap().code, "D07");
        assert!(table.containing(Coord { x: 14.5, y: 0.5 }).is_none());
        assert_eq!(table.containing(Coord { x: 16.5, y: 0.5 }).unwrap().code, "D08");
        assert_eq!(table.containing(Coord { x: 0.5, y: 0.5 }).unwrap().code, "D00");
    }

    #[test]
    fn test_strict_rejects_non_finite_vertex() {
        let err = DistrictTable::builder()
            .strict(true)
            .districts(grid_with_nan_vertex())
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::NonFiniteVertex { code } if code == "D07"));
    }

    #[test]
    fn test_containing_prefers_definition_order() {
        // Overlapping districts: the earlier one wins
        let table = DistrictTable::builder()
            .district(square("BIG", 0.0, 0.0, 10.0))
            .district(square("SMALL", 4.0, 4.0, 2.0))
            .build()
            .unwrap();
        assert_eq!(table.containing(Coord { x: 5.0, y: 5.0 }).unwrap().code, "BIG");

        let table = DistrictTable::builder()
            .district(square("SMALL", 4.0, 4.0, 2.0))
            .district(square("BIG", 0.0, 0.0, 10.0))
            .build()
            .unwrap();
        assert_eq!(table.containing(Coord { x: 5.0, y: 5.0 }).unwrap().code, "SMALL");
        assert_eq!(table.containing(Coord { x: 1.0, y: 1.0 }).unwrap().code, "BIG");
    }

    #[test]
    fn test_empty_boundary_is_not_indexed() {
        let empty = DistrictPolygon::new("E", "e", "e", Boundary::MultiRing(vec![]));
        let table = DistrictTable::builder().district(empty).build().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("E").is_some());
        assert!(table.containing(Coord { x: 0.0, y: 0.0 }).is_none());
    }
}
