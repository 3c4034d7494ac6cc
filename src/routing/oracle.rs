//! Reachability oracle seam
//!
//! Service-area computation (shortest paths over the road network) is
//! deliberately outside this crate. Implementations wrap whatever engine
//! the host provides; the pipeline only consumes the geometries it
//! returns.

use geo::{LineString, MultiLineString, Point};

use crate::Error;
use crate::model::RoadNetwork;

/// Route geometry reachable within one distance budget.
///
/// Oracles may return single polylines or multi-part polylines; the
/// endpoint extraction stage treats each part independently.
#[derive(Debug, Clone)]
pub enum RouteGeometry {
    Line(LineString<f64>),
    MultiLine(MultiLineString<f64>),
}

impl RouteGeometry {
    /// Iterates the constituent line parts uniformly.
    pub fn parts(&self) -> impl Iterator<Item = &LineString<f64>> {
        match self {
            RouteGeometry::Line(line) => std::slice::from_ref(line).iter(),
            RouteGeometry::MultiLine(multi) => multi.0.iter(),
        }
    }
}

/// A service-area engine able to return the route geometries reachable
/// from an origin within a distance budget.
pub trait ReachabilityOracle {
    /// Strategy name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Computes the route geometries reachable from `origin`.
    ///
    /// `origin` is given in the network CRS. `tolerance_m` is the
    /// maximum origin-to-network snapping distance the engine should
    /// accept.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the engine fails or the
    /// origin cannot be snapped; the adapter treats that as a signal to
    /// try the next strategy.
    fn reachable_lines(
        &self,
        network: &RoadNetwork,
        origin: Point<f64>,
        distance_m: f64,
        tolerance_m: f64,
    ) -> Result<Vec<RouteGeometry>, Error>;
}
