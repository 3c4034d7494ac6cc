//! End-to-end runs over a synthetic cross-shaped street network.
//!
//! The oracle stub hands out four straight arms clipped to the distance
//! budget, which makes every hull a diamond with known area and keeps
//! population attribution exactly checkable.

use geo::{LineString, MultiPolygon, Point, line_string, polygon};
use geojson::GeoJson;
use serde_json::{Value, json};
use walkshed::model::{Building, FieldDescriptor, FieldKind};
use walkshed::prelude::*;

/// Four arms along the axes from (0, 0), clipped to the budget.
struct CrossOracle {
    arm_m: f64,
}

impl ReachabilityOracle for CrossOracle {
    fn name(&self) -> &str {
        "cross"
    }

    fn reachable_lines(
        &self,
        _network: &RoadNetwork,
        origin: Point<f64>,
        distance_m: f64,
        tolerance_m: f64,
    ) -> Result<Vec<RouteGeometry>, Error> {
        let off = origin.x().hypot(origin.y());
        if off > tolerance_m {
            return Err(Error::RoutingError(format!(
                "origin is {off:.0} m away from the network"
            )));
        }
        let reach = distance_m.min(self.arm_m);
        Ok([(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)]
            .iter()
            .map(|&(dx, dy)| {
                RouteGeometry::Line(line_string![
                    (x: 0.0, y: 0.0),
                    (x: dx * reach, y: dy * reach),
                ])
            })
            .collect())
    }
}

/// Refuses requests below a distance threshold, then behaves like the
/// cross.
struct Threshold {
    min_distance_m: f64,
    inner: CrossOracle,
}

impl ReachabilityOracle for Threshold {
    fn name(&self) -> &str {
        "threshold"
    }

    fn reachable_lines(
        &self,
        network: &RoadNetwork,
        origin: Point<f64>,
        distance_m: f64,
        tolerance_m: f64,
    ) -> Result<Vec<RouteGeometry>, Error> {
        if distance_m < self.min_distance_m {
            return Err(Error::RoutingError("engine refused the request".to_string()));
        }
        self.inner
            .reachable_lines(network, origin, distance_m, tolerance_m)
    }
}

fn cross_network() -> RoadNetwork {
    let arms = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)]
        .iter()
        .map(|&(dx, dy)| LineString::from(vec![(0.0, 0.0), (dx * 1000.0, dy * 1000.0)]))
        .collect();
    RoadNetwork::new(arms, Crs::WebMercator)
}

fn cross_adapter() -> ReachabilityAdapter {
    ReachabilityAdapter::new(vec![Box::new(CrossOracle { arm_m: 1000.0 })], 5.0, 100.0).unwrap()
}

fn building(x0: f64, y0: f64, x1: f64, y1: f64, population: Value) -> Building {
    Building {
        footprint: MultiPolygon::from(polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ]),
        population,
    }
}

fn survey_layer() -> BuildingLayer {
    BuildingLayer::new(
        vec![
            // Inside even the 5 minute diamond
            building(50.0, 50.0, 70.0, 70.0, json!(100)),
            // Reached from 10 minutes on
            building(590.0, -10.0, 610.0, 10.0, json!("50")),
            // Never reached
            building(5000.0, 5000.0, 5020.0, 5020.0, json!(999)),
        ],
        vec![FieldDescriptor::new("Насел", FieldKind::Real)],
        Crs::WebMercator,
    )
}

#[test]
fn full_run_attributes_population_per_budget() {
    let network = cross_network();
    let layer = survey_layer();
    let index = BuildingIndex::build(&layer);

    let run = compute_isochrones(
        &network,
        &cross_adapter(),
        0.0,
        0.0,
        &[5, 10, 15],
        Some(&index),
    )
    .unwrap();

    assert!(run.skipped.is_empty());
    assert!(run.has_population_data);

    let times: Vec<u32> = run.isochrones.iter().map(|i| i.time_min).collect();
    assert_eq!(times, vec![5, 10, 15]);
    let ids: Vec<u32> = run.isochrones.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    for iso in &run.isochrones {
        assert_eq!(iso.points_count, 4);
    }
    assert!(run.isochrones[0].area_m2 < run.isochrones[1].area_m2);
    assert!(run.isochrones[1].area_m2 < run.isochrones[2].area_m2);

    // Both contained buildings are attributed in full, the far one never
    assert_eq!(run.isochrones[0].population, Some(100.0));
    assert_eq!(run.isochrones[1].population, Some(150.0));
    assert_eq!(run.isochrones[2].population, Some(150.0));
    assert_eq!(run.isochrones[0].buildings_count, Some(1.0));
    assert_eq!(run.isochrones[2].buildings_count, Some(2.0));

    for iso in &run.isochrones {
        let density = iso.density_ha.unwrap();
        let expected = iso.population.unwrap() / (iso.area_m2 / 10_000.0);
        assert!((density - expected).abs() < 1e-9);
    }
}

#[test]
fn straddling_buildings_are_attributed_by_share() {
    let network = cross_network();
    // Centered on the eastern diamond vertex at (1000, 0); 3/8 of the
    // footprint falls inside
    let layer = BuildingLayer::new(
        vec![building(980.0, -10.0, 1020.0, 10.0, json!(80))],
        vec![FieldDescriptor::new("population", FieldKind::Real)],
        Crs::WebMercator,
    );
    let index = BuildingIndex::build(&layer);

    // 12 minutes at 5 km/h is exactly 1000 m
    let run = compute_isochrones(
        &network,
        &cross_adapter(),
        0.0,
        0.0,
        &[12],
        Some(&index),
    )
    .unwrap();

    let iso = &run.isochrones[0];
    let population = iso.population.unwrap();
    assert!((population - 30.0).abs() < 0.5, "{population}");
    let count = iso.buildings_count.unwrap();
    assert!((count - 0.375).abs() < 0.01, "{count}");
}

#[test]
fn failed_budgets_are_reported_not_fatal() {
    let network = cross_network();
    let adapter = ReachabilityAdapter::new(
        vec![Box::new(Threshold {
            min_distance_m: 500.0,
            inner: CrossOracle { arm_m: 1000.0 },
        })],
        5.0,
        100.0,
    )
    .unwrap();

    let run = compute_isochrones(&network, &adapter, 0.0, 0.0, &[5, 10], None).unwrap();

    assert_eq!(run.isochrones.len(), 1);
    assert_eq!(run.isochrones[0].time_min, 10);
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].time_min, 5);
    assert!(matches!(run.skipped[0].reason, SkipReason::RoutingFailed(_)));

    let table = run.summary_table();
    assert!(table.contains("isochrone_10min"));
    assert!(table.contains("skipped 5 min"), "{table}");
}

#[test]
fn broken_strategies_fall_through_to_working_ones() {
    struct Broken;
    impl ReachabilityOracle for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn reachable_lines(
            &self,
            _network: &RoadNetwork,
            _origin: Point<f64>,
            _distance_m: f64,
            _tolerance_m: f64,
        ) -> Result<Vec<RouteGeometry>, Error> {
            Err(Error::RoutingError("always down".to_string()))
        }
    }

    let adapter = ReachabilityAdapter::new(
        vec![Box::new(Broken), Box::new(CrossOracle { arm_m: 1000.0 })],
        5.0,
        100.0,
    )
    .unwrap();

    let run = compute_isochrones(&cross_network(), &adapter, 0.0, 0.0, &[10], None).unwrap();
    assert_eq!(run.isochrones.len(), 1);
    assert!(run.skipped.is_empty());
}

#[test]
fn runs_are_reproducible() {
    let network = cross_network();
    let layer = survey_layer();
    let index = BuildingIndex::build(&layer);
    let adapter = cross_adapter();

    let first = compute_isochrones(&network, &adapter, 0.0, 0.0, &[5, 10], Some(&index)).unwrap();
    let second = compute_isochrones(&network, &adapter, 0.0, 0.0, &[5, 10], Some(&index)).unwrap();

    for (a, b) in first.isochrones.iter().zip(&second.isochrones) {
        assert_eq!(a.population, b.population);
        assert_eq!(a.buildings_count, b.buildings_count);
        assert_eq!(a.area_m2, b.area_m2);
        assert_eq!(a.points_count, b.points_count);
    }
}

#[test]
fn geojson_output_is_wgs84_with_full_attributes() {
    let network = cross_network();
    let layer = survey_layer();
    let index = BuildingIndex::build(&layer);

    let run = compute_isochrones(
        &network,
        &cross_adapter(),
        0.0,
        0.0,
        &[5, 10, 15],
        Some(&index),
    )
    .unwrap();

    let raw = run.to_geojson_string().unwrap();
    let parsed: GeoJson = raw.parse().unwrap();
    let GeoJson::FeatureCollection(collection) = parsed else {
        panic!("expected a feature collection");
    };

    assert_eq!(collection.features.len(), 3);
    let foreign = collection.foreign_members.as_ref().unwrap();
    assert_eq!(foreign["crs_authid"], json!("EPSG:3857"));

    for feature in &collection.features {
        let props = feature.properties.as_ref().unwrap();
        for key in [
            "id",
            "name",
            "time_min",
            "points_count",
            "area_m2",
            "buildings_count",
            "population",
            "density_ha",
        ] {
            assert!(props.contains_key(key), "missing {key}");
        }
        let geojson::Value::Polygon(rings) = &feature.geometry.as_ref().unwrap().value else {
            panic!("expected polygon geometry");
        };
        // Kilometer-scale diamonds shrink to hundredths of a degree
        for position in &rings[0] {
            assert!(position[0].abs() < 0.02);
            assert!(position[1].abs() < 0.02);
        }
    }
}

#[test]
fn runs_without_buildings_leave_population_unset() {
    let run = compute_isochrones(&cross_network(), &cross_adapter(), 0.0, 0.0, &[10], None)
        .unwrap();

    assert!(!run.has_population_data);
    let iso = &run.isochrones[0];
    assert!(iso.population.is_none());
    assert!(iso.density_ha.is_none());

    let table = run.summary_table();
    assert!(table.contains('-'), "{table}");
}
