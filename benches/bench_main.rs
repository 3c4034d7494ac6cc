use criterion::{Criterion, black_box, criterion_group, criterion_main};
use geo::{LineString, MultiPolygon, Point, line_string, polygon};
use serde_json::json;
use walkshed::algo::build_hull_polygon;
use walkshed::model::{Building, FieldDescriptor, FieldKind};
use walkshed::prelude::*;

struct CrossOracle;

impl ReachabilityOracle for CrossOracle {
    fn name(&self) -> &str {
        "cross"
    }

    fn reachable_lines(
        &self,
        _network: &RoadNetwork,
        _origin: Point<f64>,
        distance_m: f64,
        _tolerance_m: f64,
    ) -> Result<Vec<RouteGeometry>, Error> {
        Ok([(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)]
            .iter()
            .map(|&(dx, dy)| {
                RouteGeometry::Line(line_string![
                    (x: 0.0, y: 0.0),
                    (x: dx * distance_m, y: dy * distance_m),
                ])
            })
            .collect())
    }
}

/// Deterministic ring of survey points, dense enough to make the hull
/// dissolve step visible.
fn spiral_points(count: i32) -> Vec<Point<f64>> {
    (0..count)
        .map(|i| {
            let angle = f64::from(i) * 0.017;
            let radius = 500.0 + f64::from(i % 97) * 3.0;
            Point::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

fn building_grid() -> BuildingLayer {
    // 50 x 50 grid of 20 m footprints, 10 residents each
    let buildings: Vec<Building> = (0..2500)
        .map(|i| {
            let x0 = f64::from(i % 50) * 40.0 - 1000.0;
            let y0 = f64::from(i / 50) * 40.0 - 1000.0;
            Building {
                footprint: MultiPolygon::from(polygon![
                    (x: x0, y: y0),
                    (x: x0 + 20.0, y: y0),
                    (x: x0 + 20.0, y: y0 + 20.0),
                    (x: x0, y: y0 + 20.0),
                ]),
                population: json!(10),
            }
        })
        .collect();
    BuildingLayer::new(
        buildings,
        vec![FieldDescriptor::new("population", FieldKind::Integer)],
        Crs::WebMercator,
    )
}

fn hull_benchmark(c: &mut Criterion) {
    let points = spiral_points(10_000);
    c.bench_function("hull_10k_points", |b| {
        b.iter(|| build_hull_polygon(black_box(&points)).unwrap());
    });
}

fn population_benchmark(c: &mut Criterion) {
    let layer = building_grid();
    let index = BuildingIndex::build(&layer);
    let diamond = polygon![
        (x: 900.0, y: 0.0),
        (x: 0.0, y: 900.0),
        (x: -900.0, y: 0.0),
        (x: 0.0, y: -900.0),
    ];

    c.bench_function("population_2500_buildings", |b| {
        b.iter(|| index.aggregate_population(black_box(&diamond), Crs::WebMercator));
    });
}

fn run_benchmark(c: &mut Criterion) {
    let network = RoadNetwork::new(
        vec![LineString::from(vec![(-1500.0, 0.0), (1500.0, 0.0)])],
        Crs::WebMercator,
    );
    let adapter = ReachabilityAdapter::new(vec![Box::new(CrossOracle)], 5.0, 100.0).unwrap();
    let layer = building_grid();

    c.bench_function("full_run_three_budgets", |b| {
        b.iter(|| {
            let index = BuildingIndex::build(&layer);
            compute_isochrones(
                black_box(&network),
                &adapter,
                0.0,
                0.0,
                &[5, 10, 15],
                Some(&index),
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, hull_benchmark, population_benchmark, run_benchmark);
criterion_main!(benches);
