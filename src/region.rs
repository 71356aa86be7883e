//! Regions represent geographical areas with their own demand and deployment targets.
use crate::id::{define_id_getter, define_id_type};
use crate::site::Coordinate;
use indexmap::IndexMap;
use serde::Deserialize;

define_id_type! {RegionID}

/// A map of [`Region`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, Region>;

/// A map of [`RegionShape`]s, keyed by region ID
pub type RegionShapeMap = IndexMap<RegionID, RegionShape>;

/// Tolerance used when deciding whether a point lies on a shape's boundary
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Represents a region with an ID and a longer description.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Region {
    /// A unique identifier for a region (e.g. "BE").
    pub id: RegionID,
    /// A text description of the region (e.g. "Belgium").
    pub description: String,
}
define_id_getter! {Region, RegionID}

/// The outline of a region as a simple polygon in (longitude, latitude) space.
///
/// Points on the boundary count as being inside the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionShape {
    vertices: Vec<Coordinate>,
}

impl RegionShape {
    /// Create a new shape from its vertices, in order.
    ///
    /// The ring is closed implicitly, so the last vertex should not repeat the first.
    pub fn new(vertices: Vec<Coordinate>) -> Self {
        Self { vertices }
    }

    /// Iterate over the edges of the polygon
    fn edges(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        self.vertices
            .iter()
            .copied()
            .zip(self.vertices.iter().copied().cycle().skip(1))
    }

    /// Whether the given point lies within the shape (or on its boundary)
    pub fn contains(&self, point: &Coordinate) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }

        if self.edges().any(|(a, b)| is_on_segment(point, &a, &b)) {
            return true;
        }

        // Ray casting: count crossings of a horizontal ray heading east from the point
        let (x, y) = (point.longitude, point.latitude);
        let mut inside = false;
        for (a, b) in self.edges() {
            let (xa, ya, xb, yb) = (a.longitude, a.latitude, b.longitude, b.latitude);
            if (ya > y) != (yb > y) {
                let x_cross = xa + (y - ya) * (xb - xa) / (yb - ya);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }

        inside
    }
}

/// Whether `p` lies on the segment from `a` to `b`
fn is_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> bool {
    let cross = (b.longitude - a.longitude) * (p.latitude - a.latitude)
        - (b.latitude - a.latitude) * (p.longitude - a.longitude);
    if cross.abs() > BOUNDARY_TOLERANCE {
        return false;
    }

    let within = |v: f64, lo: f64, hi: f64| {
        v >= lo.min(hi) - BOUNDARY_TOLERANCE && v <= lo.max(hi) + BOUNDARY_TOLERANCE
    };
    within(p.longitude, a.longitude, b.longitude) && within(p.latitude, a.latitude, b.latitude)
}
