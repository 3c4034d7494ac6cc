pub use crate::{DEFAULT_SNAP_TOLERANCE_M, DEFAULT_TIME_BUDGETS_MIN, DEFAULT_WALKING_SPEED_KMH};

// Re-export key components
pub use crate::algo::{
    BuildingIndex, Isochrone, IsochroneRun, PopulationStats, SkipReason, SkippedBudget,
    compute_isochrones,
};
pub use crate::loading::{
    WalkshedConfig, load_building_layer, load_building_table, load_road_network, load_run_inputs,
};
pub use crate::routing::{ReachabilityAdapter, ReachabilityOracle, RouteGeometry};

// Core types for the spatial model
pub use crate::model::{Building, BuildingLayer, Crs, RoadNetwork};

// Units
pub use crate::Minutes; // whole minutes of walking time

pub use crate::Error;
