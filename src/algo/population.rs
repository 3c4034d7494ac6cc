//! Area-proportional population overlay
//!
//! Buildings are indexed once per run in an R-tree and shared by every
//! budget through an immutable borrow. Each polygon transforms its own
//! copy into the layer CRS, collects bounding-box candidates and
//! attributes population fully (contained footprints) or weighted by the
//! intersection share of the footprint.

use geo::{Area, BooleanOps, BoundingRect, Centroid, Contains, Intersects, Polygon};
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;
use rstar::{AABB, RTree, RTreeObject};

use crate::model::{Building, BuildingLayer, Crs, parse_population, transform_polygon};

/// Margin added to a polygon's bounding box before the candidate query,
/// in layer CRS units. Keeps boundary-adjacent buildings in the
/// candidate set.
pub const BBOX_MARGIN: f64 = 5.0;

/// Minimum intersection share of a building's footprint for partial
/// attribution. At or below this share the building is ignored.
pub const MIN_OVERLAP_RATIO: f64 = 0.05;

/// Population attributed to one polygon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PopulationStats {
    /// Population sum, weighted by footprint share for partial overlaps
    pub population: f64,
    /// Effective building count: 1.0 per contained building, the
    /// intersection share for partial overlaps
    pub buildings: f64,
}

/// Building footprint entry of the spatial index.
struct IndexedFootprint {
    envelope: AABB<[f64; 2]>,
    idx: usize,
}

impl RTreeObject for IndexedFootprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over a building layer, built once per run and queried for
/// every finalized polygon.
pub struct BuildingIndex<'a> {
    layer: &'a BuildingLayer,
    rtree: RTree<IndexedFootprint>,
}

impl<'a> BuildingIndex<'a> {
    pub fn build(layer: &'a BuildingLayer) -> Self {
        let entries: Vec<IndexedFootprint> = layer
            .buildings()
            .par_iter()
            .enumerate()
            .filter_map(|(idx, building)| {
                building
                    .footprint
                    .bounding_rect()
                    .map(|rect| IndexedFootprint {
                        envelope: AABB::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                        idx,
                    })
            })
            .collect();

        if entries.len() < layer.len() {
            warn!(
                "{} of {} buildings have no extent and were left out of the spatial index",
                layer.len() - entries.len(),
                layer.len()
            );
        }
        info!("Built spatial index over {} buildings", entries.len());

        Self {
            layer,
            rtree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn layer(&self) -> &BuildingLayer {
        self.layer
    }

    /// Aggregates population for one polygon given in `polygon_crs`.
    ///
    /// The input polygon is never modified: when the layer CRS differs,
    /// a copy is transformed and every exact test runs against that
    /// copy. Internal failures degrade this polygon to zero population
    /// and are logged, never propagated; repeated calls over the same
    /// polygon return identical results.
    pub fn aggregate_population(
        &self,
        polygon: &Polygon<f64>,
        polygon_crs: Crs,
    ) -> PopulationStats {
        let layer_crs = self.layer.crs();
        let overlay = if polygon_crs == layer_crs {
            polygon.clone()
        } else {
            match transform_polygon(polygon, polygon_crs, layer_crs) {
                Ok(p) => p,
                Err(e) => {
                    warn!(
                        "Polygon transform into the building layer CRS failed, \
                         population degraded to zero: {e}"
                    );
                    return PopulationStats::default();
                }
            }
        };

        let Some(rect) = overlay.bounding_rect() else {
            warn!("Polygon has no extent, population degraded to zero");
            return PopulationStats::default();
        };
        let search = AABB::from_corners(
            [rect.min().x - BBOX_MARGIN, rect.min().y - BBOX_MARGIN],
            [rect.max().x + BBOX_MARGIN, rect.max().y + BBOX_MARGIN],
        );

        // Sorted by layer index so the evaluation order (and the f64
        // sums) never depend on tree internals.
        let candidates: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&search)
            .map(|entry| entry.idx)
            .sorted_unstable()
            .collect();

        if candidates.is_empty() {
            debug!(
                "No building candidates near the polygon centered at {:?}",
                overlay.centroid()
            );
            return PopulationStats::default();
        }
        debug!(
            "{} building candidates in the expanded bounding box",
            candidates.len()
        );

        let buildings = self.layer.buildings();
        let contributions: Vec<(f64, f64)> = candidates
            .par_iter()
            .map(|&idx| building_share(&overlay, &buildings[idx]))
            .collect();

        let mut stats = PopulationStats::default();
        for (population, share) in contributions {
            stats.population += population;
            stats.buildings += share;
        }
        stats
    }
}

/// Contribution of one building: (weighted population, effective count).
fn building_share(overlay: &Polygon<f64>, building: &Building) -> (f64, f64) {
    let Some(population) = parse_population(&building.population).filter(|p| *p > 0.0) else {
        return (0.0, 0.0);
    };

    if !overlay.intersects(&building.footprint) {
        return (0.0, 0.0);
    }

    if overlay.contains(&building.footprint) {
        return (population, 1.0);
    }

    let footprint_area = building.footprint.unsigned_area();
    if footprint_area <= 0.0 {
        return (0.0, 0.0);
    }

    let share = overlay.intersection(&building.footprint).unsigned_area() / footprint_area;
    if share > MIN_OVERLAP_RATIO {
        (population * share, share)
    } else {
        (0.0, 0.0)
    }
}
