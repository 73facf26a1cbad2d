//! Pure, deterministic 2D geometry primitives: points, polygons, bounds.
//!
//! Every routine here is a pure function of its inputs — no floating point
//! equality comparisons, tolerances are always explicit `eps` parameters.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// A point in the level's 2D plan (feet, by convention).
pub type Point = Point2<f32>;
/// A 2D displacement vector.
pub type Vector = Vector2<f32>;
/// A closed polygon: an ordered list of vertices, implicitly closed back to
/// the first vertex. Callers never repeat the first vertex at the end.
pub type Polygon = Vec<Point>;

/// Axis-aligned bounding box in the level plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// The bounding box of a (non-empty) polygon.
    pub fn of_polygon(poly: &[Point]) -> Self {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in poly {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        Aabb {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn depth(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        nalgebra::center(&self.min, &self.max)
    }

    /// Smallest AABB containing both `self` and `other`.
    pub fn join(self, other: Self) -> Self {
        Aabb {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// Direction of a shared wall segment, from the first room's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharedEdgeDirection {
    North,
    South,
    East,
    West,
}

impl SharedEdgeDirection {
    /// The direction the same segment carries from the other room's perspective.
    pub fn mirror(self) -> Self {
        match self {
            SharedEdgeDirection::North => SharedEdgeDirection::South,
            SharedEdgeDirection::South => SharedEdgeDirection::North,
            SharedEdgeDirection::East => SharedEdgeDirection::West,
            SharedEdgeDirection::West => SharedEdgeDirection::East,
        }
    }
}

/// A segment shared between two AABBs along a common axis-aligned edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedEdge {
    pub direction: SharedEdgeDirection,
    /// Endpoints of the shared run, along the shared axis.
    pub from: Point,
    pub to: Point,
}

impl SharedEdge {
    pub fn length(&self) -> f32 {
        (self.to - self.from).magnitude()
    }

    pub fn midpoint(&self) -> Point {
        nalgebra::center(&self.from, &self.to)
    }
}

/// Tests whether two axis-aligned boxes share a wall run within `eps`,
/// returning the shared segment and its direction from `a`'s perspective.
///
/// Vertical shared edges (boxes side by side) take priority over
/// horizontal ones when both a vertical- and horizontal-overlap test would
/// pass (this cannot happen for non-degenerate, non-overlapping rooms, but
/// checking vertical first matches the order spec.md lists them in).
pub fn shared_edge(a: &Aabb, b: &Aabb, eps: f32) -> Option<SharedEdge> {
    // Vertical overlap (rooms side-by-side, sharing an east/west wall).
    let v_overlap_lo = a.min.y.max(b.min.y);
    let v_overlap_hi = a.max.y.min(b.max.y);
    let v_overlap = v_overlap_hi - v_overlap_lo;

    if v_overlap > eps {
        if (a.max.x - b.min.x).abs() < eps {
            // a is to the west of b: shared edge runs along a's east face.
            return Some(SharedEdge {
                direction: SharedEdgeDirection::East,
                from: Point::new(a.max.x, v_overlap_lo),
                to: Point::new(a.max.x, v_overlap_hi),
            });
        }
        if (b.max.x - a.min.x).abs() < eps {
            // a is to the east of b: shared edge runs along a's west face.
            return Some(SharedEdge {
                direction: SharedEdgeDirection::West,
                from: Point::new(a.min.x, v_overlap_lo),
                to: Point::new(a.min.x, v_overlap_hi),
            });
        }
    }

    // Horizontal overlap (rooms stacked north/south, sharing a north/south wall).
    let h_overlap_lo = a.min.x.max(b.min.x);
    let h_overlap_hi = a.max.x.min(b.max.x);
    let h_overlap = h_overlap_hi - h_overlap_lo;

    if h_overlap > eps {
        if (a.max.y - b.min.y).abs() < eps {
            // a is to the south of b: shared edge runs along a's north face.
            return Some(SharedEdge {
                direction: SharedEdgeDirection::North,
                from: Point::new(h_overlap_lo, a.max.y),
                to: Point::new(h_overlap_hi, a.max.y),
            });
        }
        if (b.max.y - a.min.y).abs() < eps {
            // a is to the north of b: shared edge runs along a's south face.
            return Some(SharedEdge {
                direction: SharedEdgeDirection::South,
                from: Point::new(h_overlap_lo, a.min.y),
                to: Point::new(h_overlap_hi, a.min.y),
            });
        }
    }

    None
}

/// Surface properties derivable from a closed polygon.
pub trait HasSurface {
    /// Unsigned area via the shoelace formula (m2/ft2, whatever unit the
    /// polygon's coordinates are in).
    fn area(&self) -> f32;
    /// Perimeter: sum of edge lengths.
    fn perimeter(&self) -> f32;
    /// Centroid as the plain average of vertices (acceptable for the
    /// near-convex residential rooms this crate deals with).
    fn centroid(&self) -> Point;
    /// Signed area; sign indicates winding (positive = CCW).
    fn signed_area(&self) -> f32;
}

impl HasSurface for [Point] {
    fn signed_area(&self) -> f32 {
        match self.len() {
            0 | 1 | 2 => 0.0,
            n => 0.5
                * self
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let w = self[(i + 1) % n];
                        v.x * w.y - w.x * v.y
                    })
                    .sum::<f32>(),
        }
    }

    fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    fn perimeter(&self) -> f32 {
        match self.len() {
            0 | 1 => 0.0,
            n => self
                .iter()
                .enumerate()
                .map(|(i, v)| (self[(i + 1) % n] - v).magnitude())
                .sum(),
        }
    }

    fn centroid(&self) -> Point {
        if self.is_empty() {
            return Point::origin();
        }
        let sum = self
            .iter()
            .fold(Vector::zeros(), |acc, p| acc + p.coords);
        Point::from(sum / self.len() as f32)
    }
}

/// Offsets a closed polygon outward (positive `distance`) or inward
/// (negative) along each edge's outward normal, assuming CCW winding and a
/// roughly convex, axis-aligned-ish rectilinear shape (the only footprints
/// this crate's callers produce). Each vertex is displaced along the
/// average of its two adjacent edge normals.
pub fn offset_polygon(poly: &[Point], distance: f32) -> Polygon {
    let n = poly.len();
    if n < 3 || distance == 0.0 {
        return poly.to_vec();
    }

    let edge_normal = |p0: Point, p1: Point| -> Vector {
        let edge = p1 - p0;
        Vector::new(edge.y, -edge.x).normalize()
    };

    (0..n)
        .map(|i| {
            let prev = poly[(i + n - 1) % n];
            let cur = poly[i];
            let next = poly[(i + 1) % n];
            let n0 = edge_normal(prev, cur);
            let n1 = edge_normal(cur, next);
            let bisector = (n0 + n1).normalize();
            // Scale so the offset applies per-edge distance along the miter.
            let cos_half_angle = bisector.dot(&n0).max(0.1);
            cur + bisector * (distance / cos_half_angle)
        })
        .collect()
}

/// Point-in-polygon test by horizontal-ray crossing count (Heines' method).
pub fn point_in_polygon(pt: Point, poly: &[Point]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut v_j = poly[poly.len() - 1];
    let mut y0 = v_j.y >= pt.y;
    for &v_i in poly {
        let y1 = v_i.y >= pt.y;
        if y0 != y1
            && (((v_i.y - pt.y) * (v_j.x - v_i.x) >= (v_i.x - pt.x) * (v_j.y - v_i.y)) == y1)
        {
            inside = !inside;
        }
        y0 = y1;
        v_j = v_i;
    }
    inside
}

/// NORTH/SOUTH/EAST/WEST cardinal inferred from the dominant axis of a
/// displacement. Ties (|dy| == |dx|) resolve to the vertical axis.
pub fn vector_to_cardinal(dx: f32, dy: f32) -> Cardinal {
    if dy.abs() >= dx.abs() {
        if dy >= 0.0 {
            Cardinal::North
        } else {
            Cardinal::South
        }
    } else if dx >= 0.0 {
        Cardinal::East
    } else {
        Cardinal::West
    }
}

/// A diagonal-compound cardinal description, e.g. "NORTH-EAST".
pub fn describe_relative_position(dx: f32, dy: f32) -> String {
    let major = vector_to_cardinal(dx, dy);
    let (minor_mag, major_mag) = if dy.abs() >= dx.abs() {
        (dx.abs(), dy.abs())
    } else {
        (dy.abs(), dx.abs())
    };
    if major_mag <= f32::EPSILON {
        return major.to_string();
    }
    let ratio = minor_mag / major_mag;
    if ratio > 0.5 && ratio < 2.0 {
        let minor = if dy.abs() >= dx.abs() {
            if dx >= 0.0 {
                Cardinal::East
            } else {
                Cardinal::West
            }
        } else if dy >= 0.0 {
            Cardinal::North
        } else {
            Cardinal::South
        };
        format!("{}-{}", major, minor)
    } else {
        major.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinal {
    North,
    South,
    East,
    West,
}

impl std::fmt::Display for Cardinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Cardinal::North => "NORTH",
            Cardinal::South => "SOUTH",
            Cardinal::East => "EAST",
            Cardinal::West => "WEST",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace_area_of_rectangle() {
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!((poly.area() - 200.0).abs() < 1e-6);
        assert!((poly.perimeter() - 60.0).abs() < 1e-6);
    }

    #[test]
    fn centroid_of_rectangle_is_center() {
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let c = poly.centroid();
        assert!((c.x - 5.0).abs() < 1e-6);
        assert!((c.y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn point_in_polygon_basic() {
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 5.0), &poly));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &poly));
    }

    #[test]
    fn shared_edge_is_symmetric() {
        let a = Aabb::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = Aabb::new(Point::new(10.0, 0.0), Point::new(20.0, 10.0));
        let ab = shared_edge(&a, &b, 0.5).unwrap();
        let ba = shared_edge(&b, &a, 0.5).unwrap();
        assert_eq!(ab.direction, SharedEdgeDirection::East);
        assert_eq!(ba.direction, SharedEdgeDirection::West);
        assert!((ab.length() - ba.length()).abs() < 1e-6);
    }

    #[test]
    fn offset_rectangle_outward_grows_area() {
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let grown = offset_polygon(&poly, 1.0);
        assert!((grown.area() - 22.0 * 12.0).abs() < 1e-3);
    }
}
