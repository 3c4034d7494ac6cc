//! Isochrone assembly pipeline
//!
//! Drives one run: the origin is projected once, then every time budget
//! goes through routing, terminal point extraction, hull construction
//! and the population overlay. Budgets are isolated from each other; a
//! failed budget is recorded with its reason and the run carries on.

use std::fmt;

use chrono::{DateTime, Utc};
use geo::{Point, Polygon};
use log::{info, warn};

use crate::algo::endpoints::extract_terminal_points;
use crate::algo::hull::build_hull_polygon;
use crate::algo::population::BuildingIndex;
use crate::model::{Crs, RoadNetwork, geodesic_area_m2, project_origin};
use crate::routing::ReachabilityAdapter;
use crate::{Error, Minutes};

/// Square meters per hectare.
const M2_PER_HA: f64 = 10_000.0;

/// One finalized isochrone.
#[derive(Debug, Clone)]
pub struct Isochrone {
    /// 1-based sequential id, ascending with the time budget
    pub id: u32,
    /// Stable display name, `isochrone_{minutes}min`
    pub name: String,
    pub time_min: Minutes,
    /// Terminal points that shaped the hull, counted before dissolving
    pub points_count: usize,
    /// Hull polygon in the network CRS
    pub polygon: Polygon<f64>,
    /// Ellipsoidal area in square meters, measured on the original
    /// polygon geometry
    pub area_m2: f64,
    /// `None` when the run had no building layer, distinct from 0.0
    pub population: Option<f64>,
    pub buildings_count: Option<f64>,
    pub density_ha: Option<f64>,
}

impl Isochrone {
    pub fn area_ha(&self) -> f64 {
        self.area_m2 / M2_PER_HA
    }
}

/// Why a time budget produced no isochrone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Every routing strategy failed
    RoutingFailed(String),
    /// Routing succeeded but returned no geometries
    NoRoutes,
    /// Every route part was degenerate
    NoEndpoints,
    /// Fewer than three distinct terminal points
    InsufficientPoints(usize),
    /// Degenerate hull that could not be repaired
    InvalidGeometry(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::RoutingFailed(e) => write!(f, "routing failed ({e})"),
            SkipReason::NoRoutes => write!(f, "no reachable routes"),
            SkipReason::NoEndpoints => write!(f, "no usable terminal points"),
            SkipReason::InsufficientPoints(n) => {
                write!(f, "only {n} distinct terminal points, need 3")
            }
            SkipReason::InvalidGeometry(e) => write!(f, "invalid polygon geometry ({e})"),
        }
    }
}

/// A budget that produced no polygon, with the stated reason.
#[derive(Debug, Clone)]
pub struct SkippedBudget {
    pub time_min: Minutes,
    pub reason: SkipReason,
}

/// Results of one isochrone run.
#[derive(Debug, Clone)]
pub struct IsochroneRun {
    /// Finalized isochrones, ascending by time budget
    pub isochrones: Vec<Isochrone>,
    /// Budgets that produced no polygon
    pub skipped: Vec<SkippedBudget>,
    /// Origin projected into the network CRS
    pub origin: Point<f64>,
    /// CRS the polygons are expressed in
    pub crs: Crs,
    /// Whether a building layer was supplied to the run
    pub has_population_data: bool,
    pub generated_at: DateTime<Utc>,
}

/// Computes isochrones for every time budget around one origin.
///
/// The WGS84 origin is projected into the network CRS exactly once.
/// Budgets are processed largest first, so that polygons drawn in
/// insertion order stack with the smaller ones on top; the returned run
/// is sorted ascending. Each budget is isolated: any failure becomes a
/// [`SkippedBudget`] instead of aborting the run.
///
/// # Errors
///
/// Returns [`Error::ProjectionError`] if the origin cannot be projected
/// into the network CRS and [`Error::InvalidData`] when no budgets are
/// given.
pub fn compute_isochrones(
    network: &RoadNetwork,
    adapter: &ReachabilityAdapter,
    origin_lon: f64,
    origin_lat: f64,
    budgets_min: &[Minutes],
    buildings: Option<&BuildingIndex>,
) -> Result<IsochroneRun, Error> {
    let mut budgets: Vec<Minutes> = budgets_min.to_vec();
    budgets.retain(|&m| m > 0);
    budgets.sort_unstable();
    budgets.dedup();
    if budgets.is_empty() {
        return Err(Error::InvalidData(
            "No positive time budgets provided".to_string(),
        ));
    }

    let origin = project_origin(origin_lon, origin_lat, network.crs())?;
    info!(
        "Origin ({origin_lon:.6}, {origin_lat:.6}) projected to ({:.1}, {:.1}) in {}",
        origin.x(),
        origin.y(),
        network.crs()
    );

    let mut isochrones = Vec::with_capacity(budgets.len());
    let mut skipped = Vec::new();

    for &minutes in budgets.iter().rev() {
        match assemble_budget(network, adapter, origin, minutes, buildings) {
            Ok(isochrone) => isochrones.push(isochrone),
            Err(reason) => {
                warn!("Skipping the {minutes} min budget: {reason}");
                skipped.push(SkippedBudget {
                    time_min: minutes,
                    reason,
                });
            }
        }
    }

    isochrones.sort_by_key(|iso| iso.time_min);
    for (id, iso) in (1u32..).zip(isochrones.iter_mut()) {
        iso.id = id;
    }
    skipped.sort_by_key(|s| s.time_min);

    info!(
        "Run finished: {} isochrones, {} skipped budgets",
        isochrones.len(),
        skipped.len()
    );

    Ok(IsochroneRun {
        isochrones,
        skipped,
        origin,
        crs: network.crs(),
        has_population_data: buildings.is_some(),
        generated_at: Utc::now(),
    })
}

fn assemble_budget(
    network: &RoadNetwork,
    adapter: &ReachabilityAdapter,
    origin: Point<f64>,
    minutes: Minutes,
    buildings: Option<&BuildingIndex>,
) -> Result<Isochrone, SkipReason> {
    let routes = adapter
        .reachable_routes(network, origin, minutes)
        .map_err(|e| SkipReason::RoutingFailed(e.to_string()))?;
    if routes.is_empty() {
        return Err(SkipReason::NoRoutes);
    }
    info!("{minutes} min: {} route geometries", routes.len());

    let endpoints = extract_terminal_points(&routes);
    if endpoints.is_empty() {
        return Err(SkipReason::NoEndpoints);
    }
    info!("{minutes} min: {} terminal points", endpoints.len());

    let polygon = build_hull_polygon(&endpoints).map_err(|e| match e {
        Error::InsufficientPoints(n) => SkipReason::InsufficientPoints(n),
        other => SkipReason::InvalidGeometry(other.to_string()),
    })?;

    // The overlay below works on its own CRS-transformed copy; the area
    // is measured on the original polygon.
    let stats = buildings.map(|index| index.aggregate_population(&polygon, network.crs()));

    let area_m2 = geodesic_area_m2(&polygon, network.crs())
        .map_err(|e| SkipReason::InvalidGeometry(e.to_string()))?;
    let area_ha = area_m2 / M2_PER_HA;

    let population = stats.map(|s| s.population);
    let buildings_count = stats.map(|s| s.buildings);
    let density_ha = stats.map(|s| {
        if area_ha > 0.0 {
            s.population / area_ha
        } else {
            0.0
        }
    });

    match (population, density_ha) {
        (Some(pop), Some(dens)) => {
            info!("{minutes} min: area {area_ha:.2} ha, population {pop:.0}, density {dens:.1}/ha");
        }
        _ => info!("{minutes} min: area {area_ha:.2} ha (no population data)"),
    }

    Ok(Isochrone {
        id: 0, // assigned after the ascending sort
        name: format!("isochrone_{minutes}min"),
        time_min: minutes,
        points_count: endpoints.len(),
        polygon,
        area_m2,
        population,
        buildings_count,
        density_ha,
    })
}
