//! GeoJSON layer loaders
//!
//! Reads road networks and building layers from GeoJSON feature
//! collections. Features whose geometry the pipeline cannot use are
//! skipped with a warning instead of failing the load; the attribute
//! schema of a building layer is inferred from feature properties.

use std::path::Path;
use std::str::FromStr;

use geo::{Geometry, LineString, MultiPolygon};
use geojson::{FeatureCollection, GeoJson};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use serde_json::Value;

use crate::Error;
use crate::model::{
    Building, BuildingLayer, Crs, FieldDescriptor, FieldKind, RoadNetwork, parse_population,
    resolve_population_field,
};

/// Loads a road network from a GeoJSON file.
///
/// `crs` declares what the file's coordinates are expressed in; plain
/// GeoJSON is WGS84.
///
/// # Errors
///
/// Returns [`Error::IoError`] if the file cannot be read, plus
/// everything [`road_network_from_geojson_str`] returns.
pub fn load_road_network(path: impl AsRef<Path>, crs: Crs) -> Result<RoadNetwork, Error> {
    info!("Loading road network from {}", path.as_ref().display());
    let raw = std::fs::read_to_string(path)?;
    road_network_from_geojson_str(&raw, crs)
}

/// Parses a road network from GeoJSON text.
///
/// `LineString` features become segments, `MultiLineString` features
/// are flattened into one segment per part. Other geometry types are
/// skipped.
///
/// # Errors
///
/// Returns [`Error::GeoJsonError`] for text that is not a feature
/// collection and [`Error::InvalidData`] when no feature carries
/// usable linework.
pub fn road_network_from_geojson_str(raw: &str, crs: Crs) -> Result<RoadNetwork, Error> {
    let collection = parse_collection(raw)?;
    let mut segments: Vec<LineString<f64>> = Vec::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        match Geometry::<f64>::try_from(geometry) {
            Ok(Geometry::LineString(line)) => segments.push(line),
            Ok(Geometry::MultiLineString(multi)) => segments.extend(multi.0),
            Ok(_) => skipped += 1,
            Err(e) => {
                warn!("Skipping road feature with undecodable geometry: {e}");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{skipped} road features carried no usable linework");
    }
    if segments.is_empty() {
        return Err(Error::InvalidData(
            "Road network contains no line geometries".to_string(),
        ));
    }
    info!("Road network loaded: {} segments in {crs}", segments.len());
    Ok(RoadNetwork::new(segments, crs))
}

/// Loads a building layer from a GeoJSON file.
///
/// # Errors
///
/// Returns [`Error::IoError`] if the file cannot be read, plus
/// everything [`building_layer_from_geojson_str`] returns.
pub fn load_building_layer(path: impl AsRef<Path>, crs: Crs) -> Result<BuildingLayer, Error> {
    info!("Loading building layer from {}", path.as_ref().display());
    let raw = std::fs::read_to_string(path)?;
    building_layer_from_geojson_str(&raw, crs)
}

/// Parses a building layer from GeoJSON text.
///
/// Keeps one building per `Polygon` or `MultiPolygon` feature and
/// plucks the resolved population attribute out of its properties,
/// leaving the value raw for per-building parsing later.
///
/// # Errors
///
/// Returns [`Error::GeoJsonError`] for text that is not a feature
/// collection and [`Error::FieldNotFound`] when no property qualifies
/// as a population column.
pub fn building_layer_from_geojson_str(raw: &str, crs: Crs) -> Result<BuildingLayer, Error> {
    let collection = parse_collection(raw)?;
    let fields = infer_fields(&collection);
    let population_field = resolve_population_field(&fields)?;
    info!("Population attribute resolved to '{population_field}'");

    let mut buildings = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let footprint = match Geometry::<f64>::try_from(geometry) {
            Ok(Geometry::Polygon(polygon)) => MultiPolygon::from(polygon),
            Ok(Geometry::MultiPolygon(multi)) => multi,
            Ok(_) => {
                skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Skipping building feature with undecodable geometry: {e}");
                skipped += 1;
                continue;
            }
        };
        let population = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(&population_field))
            .cloned()
            .unwrap_or(Value::Null);
        buildings.push(Building {
            footprint,
            population,
        });
    }

    if skipped > 0 {
        warn!("{skipped} building features carried no polygon footprint");
    }
    log_population_sample(&buildings, &population_field);
    info!("Building layer loaded: {} footprints in {crs}", buildings.len());
    Ok(BuildingLayer::new(buildings, fields, crs))
}

fn parse_collection(raw: &str) -> Result<FeatureCollection, Error> {
    match GeoJson::from_str(raw).map_err(|e| Error::GeoJsonError(e.to_string()))? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(Error::GeoJsonError(
            "Expected a FeatureCollection".to_string(),
        )),
    }
}

/// Collects the attribute schema across all features, in first-seen
/// property order.
fn infer_fields(collection: &FeatureCollection) -> Vec<FieldDescriptor> {
    let mut order: Vec<String> = Vec::new();
    let mut kinds: HashMap<String, Option<FieldKind>> = HashMap::new();

    for feature in &collection.features {
        let Some(props) = &feature.properties else {
            continue;
        };
        for (name, value) in props {
            let kind = value_kind(value);
            match kinds.get_mut(name.as_str()) {
                None => {
                    order.push(name.clone());
                    kinds.insert(name.clone(), kind);
                }
                Some(existing) => *existing = merge_kinds(*existing, kind),
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            // All-null columns stay text
            let kind = kinds[name.as_str()].unwrap_or(FieldKind::Text);
            FieldDescriptor::new(name, kind)
        })
        .collect()
}

/// Kind of a single JSON property value; `None` for null, which says
/// nothing about the column.
fn value_kind(value: &Value) -> Option<FieldKind> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(FieldKind::Integer),
        Value::Number(_) => Some(FieldKind::Real),
        Value::Null => None,
        _ => Some(FieldKind::Text),
    }
}

pub(super) fn merge_kinds(a: Option<FieldKind>, b: Option<FieldKind>) -> Option<FieldKind> {
    match (a, b) {
        (None, k) | (k, None) => k,
        (Some(FieldKind::Text), _) | (_, Some(FieldKind::Text)) => Some(FieldKind::Text),
        (Some(FieldKind::Real), _) | (_, Some(FieldKind::Real)) => Some(FieldKind::Real),
        _ => Some(FieldKind::Integer),
    }
}

/// Logs how usable the resolved population column is, with a raw value
/// sample for debugging survey data quality.
fn log_population_sample(buildings: &[Building], field: &str) {
    let parsed = buildings
        .iter()
        .filter(|b| parse_population(&b.population).is_some())
        .count();
    info!(
        "Field '{field}': {parsed} of {} buildings carry a parseable population value",
        buildings.len()
    );
    let sample = buildings
        .iter()
        .take(100)
        .map(|b| b.population.to_string())
        .join(", ");
    debug!("Population sample: [{sample}]");
}
