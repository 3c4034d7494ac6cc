//! Time-budget adapter over reachability oracles

use geo::Point;
use log::{debug, warn};

use super::oracle::{ReachabilityOracle, RouteGeometry};
use crate::model::RoadNetwork;
use crate::{Error, Minutes};

/// Converts time budgets into distance budgets and queries an ordered
/// list of reachability strategies, falling back on failure.
pub struct ReachabilityAdapter {
    strategies: Vec<Box<dyn ReachabilityOracle>>,
    speed_kmh: f64,
    tolerance_m: f64,
}

impl ReachabilityAdapter {
    /// Creates an adapter from an ordered strategy list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] when the strategy list is empty or
    /// the walking speed is not strictly positive.
    pub fn new(
        strategies: Vec<Box<dyn ReachabilityOracle>>,
        speed_kmh: f64,
        tolerance_m: f64,
    ) -> Result<Self, Error> {
        if strategies.is_empty() {
            return Err(Error::InvalidData(
                "No reachability strategies provided".to_string(),
            ));
        }
        if speed_kmh <= 0.0 {
            return Err(Error::InvalidData(format!(
                "Walking speed must be positive, got {speed_kmh} km/h"
            )));
        }
        if tolerance_m < 0.0 {
            return Err(Error::InvalidData(format!(
                "Snapping tolerance must not be negative, got {tolerance_m} m"
            )));
        }
        Ok(Self {
            strategies,
            speed_kmh,
            tolerance_m,
        })
    }

    /// Walking distance reachable within `minutes` at the configured
    /// speed.
    pub fn distance_budget_m(&self, minutes: Minutes) -> f64 {
        (self.speed_kmh * 1000.0 / 3600.0) * f64::from(minutes) * 60.0
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn tolerance_m(&self) -> f64 {
        self.tolerance_m
    }

    /// Queries the strategies in order until one succeeds.
    ///
    /// An empty result is a valid answer (nothing reachable). Only the
    /// failure of every strategy is an error, and callers are expected
    /// to skip the affected budget rather than abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoutingError`] when all strategies fail.
    pub fn reachable_routes(
        &self,
        network: &RoadNetwork,
        origin: Point<f64>,
        minutes: Minutes,
    ) -> Result<Vec<RouteGeometry>, Error> {
        let distance_m = self.distance_budget_m(minutes);
        debug!(
            "Distance budget for {minutes} min at {} km/h: {distance_m:.1} m",
            self.speed_kmh
        );

        let mut last_failure = String::new();
        for strategy in &self.strategies {
            match strategy.reachable_lines(network, origin, distance_m, self.tolerance_m) {
                Ok(routes) => {
                    debug!(
                        "Strategy '{}' returned {} route geometries for the {minutes} min budget",
                        strategy.name(),
                        routes.len()
                    );
                    return Ok(routes);
                }
                Err(e) => {
                    warn!(
                        "Reachability strategy '{}' failed for the {minutes} min budget: {e}",
                        strategy.name()
                    );
                    last_failure = format!("{}: {e}", strategy.name());
                }
            }
        }

        Err(Error::RoutingError(format!(
            "All strategies failed for the {minutes} min budget, last failure: {last_failure}"
        )))
    }
}
