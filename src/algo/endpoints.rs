//! Terminal point extraction from reachable route geometries
//!
//! A service-area engine returns the reachable paths as polylines; the
//! representative polygon for a budget is shaped only by where those
//! paths end. Intermediate vertices are ignored by design.

use geo::Point;

use crate::routing::RouteGeometry;

/// Collects the final vertex of every route part.
///
/// Parts with fewer than two vertices carry no direction and contribute
/// nothing. Coincident endpoints from overlapping routes are kept; the
/// hull builder dissolves them later.
pub fn extract_terminal_points(routes: &[RouteGeometry]) -> Vec<Point<f64>> {
    routes
        .iter()
        .flat_map(RouteGeometry::parts)
        .filter(|part| part.0.len() >= 2)
        .filter_map(|part| part.0.last().copied().map(Point::from))
        .collect()
}
