//! Pedestrian isochrone construction with population overlay
//!
//! `walkshed` computes reachable-area polygons around a single origin for a
//! set of time budgets and attributes population to each polygon from a
//! building footprint layer. Shortest-path computation itself is delegated
//! to a host-provided [`ReachabilityOracle`]; this crate owns everything
//! around it: coordinate handling, terminal point extraction, hull
//! construction, spatial population overlay and run reporting.

pub mod algo;
mod error;
pub mod loading;
pub mod model;
pub mod prelude;
mod report;
pub mod routing;

pub use error::Error;

pub use algo::isochrone::{Isochrone, IsochroneRun, compute_isochrones};
pub use algo::population::BuildingIndex;
pub use loading::WalkshedConfig;
pub use model::{BuildingLayer, Crs, RoadNetwork};
pub use routing::{ReachabilityAdapter, ReachabilityOracle, RouteGeometry};

/// Time budget in minutes.
pub type Minutes = u32;

/// Default pedestrian walking speed in km/h.
pub const DEFAULT_WALKING_SPEED_KMH: f64 = 5.0;

/// Default maximum origin-to-network snapping distance in meters.
pub const DEFAULT_SNAP_TOLERANCE_M: f64 = 100.0;

/// Default time budgets in minutes.
pub const DEFAULT_TIME_BUDGETS_MIN: [Minutes; 3] = [5, 10, 15];
