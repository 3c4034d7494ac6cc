//! Data model for isochrone construction
//!
//! Contains the coordinate systems, the road network handed to
//! reachability oracles and the building layer used for the population
//! overlay.

pub mod buildings;
pub mod crs;
pub mod network;

// Re-export of basic types for convenience
pub use buildings::{
    Building, BuildingLayer, FieldDescriptor, FieldKind, parse_population,
    resolve_population_field,
};
pub use crs::{Crs, geodesic_area_m2, project_origin, transform_point, transform_polygon};
pub use network::RoadNetwork;
