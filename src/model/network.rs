//! Pedestrian road network model
//!
//! The network is an opaque input for reachability oracles. The crate
//! never routes over it itself; it only hands the segments to whatever
//! engine the host configured, together with the projected origin.

use geo::{BoundingRect, Coord, LineString, MapCoords, Rect};

use crate::Error;
use crate::model::{Crs, crs::transform_coord};

/// Road network in a single projected CRS.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    segments: Vec<LineString<f64>>,
    crs: Crs,
}

impl RoadNetwork {
    pub fn new(segments: Vec<LineString<f64>>, crs: Crs) -> Self {
        Self { segments, crs }
    }

    pub fn segments(&self) -> &[LineString<f64>] {
        &self.segments
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Reprojects every segment into `to`, consuming the network.
    ///
    /// Loaders use this to move geographic source data into the
    /// projected CRS the run works in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectionError`] if any vertex falls outside
    /// the domain of the target projection.
    pub fn reproject(self, to: Crs) -> Result<Self, Error> {
        if self.crs == to {
            return Ok(self);
        }
        let from = self.crs;
        let segments = self
            .segments
            .into_iter()
            .map(|line| line.try_map_coords(|c| transform_coord(c, from, to)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self { segments, crs: to })
    }

    /// Extent of the network, `None` when it has no segments.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.segments
            .iter()
            .filter_map(BoundingRect::bounding_rect)
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}
