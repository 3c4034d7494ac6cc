//! CSV building table loader
//!
//! Loads building layers from delimiter-separated tables with a WKT
//! geometry column, the usual shape of spreadsheet exports. Column
//! kinds are sniffed from the cell contents since CSV carries no type
//! information.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use geo::{Geometry, MultiPolygon};
use log::{info, warn};
use serde_json::Value;
use wkt::TryFromWkt;

use super::vector::merge_kinds;
use crate::Error;
use crate::model::{
    Building, BuildingLayer, Crs, FieldDescriptor, FieldKind, resolve_population_field,
};

/// Header names recognized as the WKT geometry column, compared case
/// insensitively.
const GEOMETRY_COLUMNS: &[&str] = &["wkt", "geometry", "geom"];

/// Loads a building layer from a CSV file with a WKT geometry column.
///
/// # Errors
///
/// Returns [`Error::IoError`] if the file cannot be opened, plus
/// everything [`building_layer_from_csv_reader`] returns.
pub fn load_building_table(path: impl AsRef<Path>, crs: Crs) -> Result<BuildingLayer, Error> {
    info!("Loading building table from {}", path.as_ref().display());
    let file = File::open(path)?;
    building_layer_from_csv_reader(file, crs)
}

/// Parses a building layer from CSV text.
///
/// # Errors
///
/// See [`building_layer_from_csv_reader`].
pub fn building_layer_from_csv_str(raw: &str, crs: Crs) -> Result<BuildingLayer, Error> {
    building_layer_from_csv_reader(raw.as_bytes(), crs)
}

/// Parses a building layer from a CSV reader.
///
/// Rows whose WKT cell holds something other than a polygon are
/// skipped; all non-geometry columns become attribute fields with cell
/// values kept raw for per-building parsing later.
///
/// # Errors
///
/// Returns [`Error::CsvError`] for a malformed header,
/// [`Error::InvalidData`] when no geometry column is present and
/// [`Error::FieldNotFound`] when no column qualifies as a population
/// attribute.
pub fn building_layer_from_csv_reader<R: Read>(
    reader: R,
    crs: Crs,
) -> Result<BuildingLayer, Error> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let geometry_column = headers
        .iter()
        .position(|h| GEOMETRY_COLUMNS.contains(&h.to_lowercase().as_str()))
        .ok_or_else(|| {
            Error::InvalidData("Building table has no WKT geometry column".to_string())
        })?;

    let records: Vec<csv::StringRecord> = reader.records().filter_map(Result::ok).collect();

    let mut fields = Vec::with_capacity(headers.len().saturating_sub(1));
    for (idx, name) in headers.iter().enumerate() {
        if idx == geometry_column {
            continue;
        }
        let kind = records
            .iter()
            .filter_map(|record| record.get(idx))
            .map(sniff_kind)
            .fold(None, merge_kinds)
            .unwrap_or(FieldKind::Text);
        fields.push(FieldDescriptor::new(name, kind));
    }

    let population_field = resolve_population_field(&fields)?;
    info!("Population attribute resolved to '{population_field}'");
    let population_column = headers
        .iter()
        .position(|h| h == population_field)
        .ok_or(Error::FieldNotFound)?;

    let mut buildings = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in &records {
        let footprint = match record.get(geometry_column).map(parse_wkt_footprint) {
            Some(Ok(Some(footprint))) => footprint,
            Some(Ok(None)) => {
                skipped += 1;
                continue;
            }
            Some(Err(e)) => {
                warn!("Skipping table row with bad geometry: {e}");
                skipped += 1;
                continue;
            }
            None => {
                skipped += 1;
                continue;
            }
        };
        let population = match record.get(population_column) {
            Some(cell) if !cell.trim().is_empty() => Value::String(cell.to_string()),
            _ => Value::Null,
        };
        buildings.push(Building {
            footprint,
            population,
        });
    }

    if skipped > 0 {
        warn!("{skipped} table rows carried no polygon footprint");
    }
    info!("Building table loaded: {} footprints in {crs}", buildings.len());
    Ok(BuildingLayer::new(buildings, fields, crs))
}

/// Sniffs a column kind from one cell; `None` for empty cells, which
/// say nothing about the column.
fn sniff_kind(cell: &str) -> Option<FieldKind> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.parse::<i64>().is_ok() {
        return Some(FieldKind::Integer);
    }
    if trimmed.replace(',', ".").parse::<f64>().is_ok() {
        return Some(FieldKind::Real);
    }
    Some(FieldKind::Text)
}

fn parse_wkt_footprint(raw: &str) -> Result<Option<MultiPolygon<f64>>, Error> {
    let geometry = Geometry::<f64>::try_from_wkt_str(raw)
        .map_err(|e| Error::InvalidData(format!("Invalid WKT: {e}")))?;
    Ok(match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::from(polygon)),
        Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    })
}
