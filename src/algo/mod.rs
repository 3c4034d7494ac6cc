//! Isochrone construction algorithms
//!
//! The pipeline stages live here: terminal point extraction from route
//! geometries, convex hull construction with repair, the spatially
//! indexed population overlay and the per-budget assembler that ties
//! them together.

pub mod endpoints;
pub mod hull;
pub mod isochrone;
pub mod population;

pub use endpoints::extract_terminal_points;
pub use hull::{MIN_HULL_POINTS, build_hull_polygon};
pub use isochrone::{Isochrone, IsochroneRun, SkipReason, SkippedBudget, compute_isochrones};
pub use population::{BBOX_MARGIN, BuildingIndex, MIN_OVERLAP_RATIO, PopulationStats};
