//! Representative polygon construction over terminal points
//!
//! The boundary is deliberately the plain convex hull: it matches the
//! field-survey workflow this crate replaces and over-approximates
//! concave reachable areas. Alpha shapes are out of scope.

use geo::{Area, BooleanOps, ConvexHull, MultiPoint, Point, Polygon, Validation};
use hashbrown::HashSet;
use log::warn;

use crate::Error;

/// Minimum number of terminal points needed to form a polygon.
pub const MIN_HULL_POINTS: usize = 3;

/// Builds the convex hull polygon over a budget's terminal points.
///
/// Exactly coincident points are dissolved first; the hull then runs
/// over the distinct survivors. An invalid or degenerate hull goes
/// through union-based repair before being given up on.
///
/// # Errors
///
/// Returns [`Error::InsufficientPoints`] when fewer than three distinct
/// points remain and [`Error::InvalidGeometry`] when the hull cannot be
/// repaired into a valid polygon with a positive area.
pub fn build_hull_polygon(points: &[Point<f64>]) -> Result<Polygon<f64>, Error> {
    if points.len() < MIN_HULL_POINTS {
        return Err(Error::InsufficientPoints(points.len()));
    }

    let distinct = dissolve_coincident(points);
    if distinct.len() < MIN_HULL_POINTS {
        return Err(Error::InsufficientPoints(distinct.len()));
    }

    let hull = MultiPoint::from(distinct).convex_hull();
    if hull.is_valid() && hull.unsigned_area() > 0.0 {
        return Ok(hull);
    }

    warn!("Convex hull is invalid or degenerate, attempting union-based repair");
    repair_polygon(&hull)
}

/// Repairs an invalid polygon by unioning it with itself and keeping the
/// largest resulting part.
///
/// This mirrors the make-valid behavior of GIS engines: rings are
/// rebuilt with an even-odd style sweep, splitting self-intersections
/// into simple parts.
///
/// # Errors
///
/// Returns [`Error::InvalidGeometry`] when the reconstruction yields no
/// valid polygon with a positive area.
pub fn repair_polygon(polygon: &Polygon<f64>) -> Result<Polygon<f64>, Error> {
    let repaired = polygon.union(polygon);
    let best = repaired
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .ok_or_else(|| Error::InvalidGeometry("Repair produced an empty geometry".to_string()))?;

    if best.is_valid() && best.unsigned_area() > 0.0 {
        Ok(best)
    } else {
        Err(Error::InvalidGeometry(
            "Polygon could not be repaired".to_string(),
        ))
    }
}

/// Removes exactly coincident points, preserving first-seen order.
fn dissolve_coincident(points: &[Point<f64>]) -> Vec<Point<f64>> {
    let mut seen = HashSet::with_capacity(points.len());
    points
        .iter()
        .filter(|p| seen.insert((p.x().to_bits(), p.y().to_bits())))
        .copied()
        .collect()
}
