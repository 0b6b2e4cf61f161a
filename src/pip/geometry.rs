//! Planar ring geometry used by district lookups.
//!
//! All functions treat coordinates as flat `(x = lng, y = lat)` pairs.
//! Nothing here is geodesic.

use geo::{BoundingRect, Coord, Distance, Euclidean, LineString, Point, Rect};

/// Number of vertices in a ring, not counting a repeated closing vertex
pub fn open_len(ring: &LineString<f64>) -> usize {
    let coords = &ring.0;
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 && first == last => coords.len() - 1,
        _ => coords.len(),
    }
}

/// Number of distinct vertices in a ring, counting no further than `limit`
pub fn distinct_vertices(ring: &LineString<f64>, limit: usize) -> usize {
    let mut seen: Vec<Coord<f64>> = Vec::with_capacity(limit.min(ring.0.len()));
    for c in &ring.0 {
        if seen.len() >= limit {
            break;
        }
        if !seen.contains(c) {
            seen.push(*c);
        }
    }
    seen.len()
}

/// A ring needs at least three distinct vertices to enclose anything
pub fn is_degenerate(ring: &LineString<f64>) -> bool {
    distinct_vertices(ring, 3) < 3
}

/// Every vertex has finite coordinates
pub fn is_finite_ring(ring: &LineString<f64>) -> bool {
    ring.0.iter().all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Even-odd ray casting: cast a ray from `point` toward +x and count edge
/// crossings.
///
/// Works for open and closed rings alike (a repeated closing vertex yields a
/// zero-length edge that never crosses). Points exactly on an edge or vertex
/// may land on either side.
pub fn ring_contains(ring: &LineString<f64>, point: Coord<f64>) -> bool {
    if open_len(ring) < 3 {
        return false;
    }

    let vertices = &ring.0;
    let n = vertices.len();
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];

        if (vi.y > point.y) != (vj.y > point.y) {
            let x_cross = (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Arithmetic mean of the ring's vertices as stored (not area-weighted).
///
/// A repeated closing vertex is counted like any other vertex.
pub fn vertex_mean(ring: &LineString<f64>) -> Option<Coord<f64>> {
    let n = ring.0.len();
    if n == 0 {
        return None;
    }

    let (sum_x, sum_y) = ring
        .0
        .iter()
        .fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));

    Some(Coord {
        x: sum_x / n as f64,
        y: sum_y / n as f64,
    })
}

/// Flat Euclidean distance in degrees
pub fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean.distance(Point::from(a), Point::from(b))
}

/// Bounding rectangle over a set of rings
pub fn rings_envelope(rings: &[LineString<f64>]) -> Option<Rect<f64>> {
    rings
        .iter()
        .filter_map(|ring| ring.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            )
        })
}

/// Close the ring if needed
pub fn close_ring(mut coords: Vec<Coord<f64>>) -> LineString<f64> {
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

/// Closed axis-aligned square centred on `center`, starting at the
/// south-west corner and running counter-clockwise.
pub fn square_around(center: Coord<f64>, half_width: f64) -> LineString<f64> {
    close_ring(vec![
        Coord {
            x: center.x - half_width,
            y: center.y - half_width,
        },
        Coord {
            x: center.x + half_width,
            y: center.y - half_width,
        },
        Coord {
            x: center.x + half_width,
            y: center.y + half_width,
        },
        Coord {
            x: center.x - half_width,
            y: center.y + half_width,
        },
    ])
}
